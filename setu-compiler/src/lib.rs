pub mod compile;
pub mod dialect;
pub mod error;
pub mod fingerprint;
pub mod rls;

pub use compile::{compile, ColumnMeta, ColumnType, CompiledQuery, TenantContext};
pub use dialect::{descriptor_for, DialectDescriptor, LimitSyntax, ParamStyle};
pub use error::CompileError;
pub use fingerprint::{fingerprint, Fingerprint};
pub use rls::wrap_raw_sql;

pub mod prelude {
    pub use crate::{
        compile, descriptor_for, fingerprint, wrap_raw_sql, ColumnMeta, ColumnType, CompileError,
        CompiledQuery, DialectDescriptor, Fingerprint, TenantContext,
    };
}
