//! Export analysis for Go packages: syntax model, declaration lookup, export-site scanning,
//! binding resolution and member classification

pub mod binding;
pub mod classify;
pub mod error;
pub mod index;
pub mod scanner;
pub mod syntax;
pub mod types;

pub use binding::{Binding, BindingResolver, MAX_RESOLUTION_PASSES};
pub use classify::{
    classify, classify_named, exportable_types, is_exportable, Arg, ClassifiedType, Method,
    Property, Signal, INTERFACE_METHOD, METHODS_FIELD, SIGNALS_FIELD,
};
pub use error::{CoreError, Result};
pub use index::{Declaration, DeclarationIndex, PackageScope};
pub use scanner::{ExportRegistry, ExportSite, LocalDecl, LocalScope, RawExpr, EXPORT_CALL};
pub use syntax::SourceUnit;
pub use types::{GoType, ScalarKind, TypeShape};
