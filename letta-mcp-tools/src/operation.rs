//! Operation discriminators.
//!
//! Each hub declares its operations with [`operations!`](crate::operations),
//! which generates a fieldless enum plus an [`OperationSet`] impl carrying the
//! wire name, accepted aliases and the ordered list of required fields. Hubs
//! then `match` on the enum, so a missing handler is a compile error.

use letta_mcp_core::args::{operation_name, validate_required};
use letta_mcp_core::{HubError, HubResult};
use serde_json::Value as JsonValue;

/// A closed set of operations belonging to one tool.
pub trait OperationSet: Copy + Sized + 'static {
    /// Tool name the operations belong to.
    const TOOL: &'static str;

    /// Every operation, in declaration order.
    const ALL: &'static [Self];

    /// Canonical wire name.
    fn name(&self) -> &'static str;

    /// Look up an operation by wire name or alias.
    fn parse(name: &str) -> Option<Self>;

    /// Required fields, in the order they are validated.
    fn required_fields(&self) -> &'static [&'static str];

    /// Canonical names of every operation.
    fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|op| op.name()).collect()
    }
}

/// Resolve and validate the operation named in `args`.
///
/// Unknown operations are rejected before any field is checked; required
/// fields are then checked in declaration order.
pub fn resolve<O: OperationSet>(args: &JsonValue) -> HubResult<O> {
    let name = operation_name(args)?;
    let op = O::parse(name).ok_or_else(|| HubError::unknown_operation(O::TOOL, name))?;
    validate_required(args, op.required_fields(), name)?;
    Ok(op)
}

/// Declare the operations of a hub.
///
/// ```rust
/// use letta_mcp_tools::operation::OperationSet;
///
/// letta_mcp_tools::operations! {
///     /// Job operations.
///     pub enum JobOp for "letta_job_monitor" {
///         /// List jobs.
///         List = "list" => [],
///         /// Fetch one job.
///         Get = "get" | "fetch" => ["job_id"],
///     }
/// }
///
/// assert_eq!(JobOp::parse("fetch"), Some(JobOp::Get));
/// assert_eq!(JobOp::Get.required_fields(), &["job_id"]);
/// assert_eq!(JobOp::names(), vec!["list", "get"]);
/// ```
#[macro_export]
macro_rules! operations {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident for $tool:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $op:literal $(| $alias:literal)* => [$($field:literal),* $(,)?]
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )*
        }

        impl $crate::operation::OperationSet for $name {
            const TOOL: &'static str = $tool;
            const ALL: &'static [Self] = &[$(Self::$variant),*];

            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $op,)*
                }
            }

            fn parse(name: &str) -> Option<Self> {
                match name {
                    $($op $(| $alias)* => Some(Self::$variant),)*
                    _ => None,
                }
            }

            fn required_fields(&self) -> &'static [&'static str] {
                match self {
                    $(Self::$variant => &[$($field),*],)*
                }
            }
        }
    };
}
