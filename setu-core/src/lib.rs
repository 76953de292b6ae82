pub mod config;
pub mod error;
pub mod guards;
pub mod health;
pub mod http;
pub mod interceptors;
pub mod layers;
pub mod prelude;
pub mod secure_headers;
pub mod service;
pub mod sse;
pub mod state;
pub mod types;
#[cfg(feature = "validation")]
pub mod validation;
#[cfg(feature = "ws")]
pub mod ws;

pub use config::{
    register_section, registered_sections, validate_keys, validate_section, ConfigError,
    ConfigProperties, ConfigValidationError, ConfigValue, DefaultSecretResolver, FromConfigValue,
    MissingKeyError, PropertyMeta, RegisteredSection, SecretResolver, SetuConfig,
};
pub use error::AppError;
pub use guards::{
    Guard, GuardContext, Identity, NoIdentity, PathParams, PreAuthGuard, PreAuthGuardContext,
    RolesGuard,
};
pub use interceptors::{Cacheable, Interceptor, InterceptorContext};
pub use layers::{catch_panic_layer, default_cors, default_trace, init_tracing};
pub use secure_headers::SecureHeaders;
pub use service::ServiceComponent;
pub use state::SetuState;
