mod settings;

pub use settings::{
    DeliveryConfig, DiagnosticsConfig, LogFormat, LoggingConfig, RegistryConfig, Settings,
};
