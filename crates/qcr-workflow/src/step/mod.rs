pub mod binding;
pub mod context;

pub use binding::{CommandArguments, FormValue, FormValues, ParameterBinder};
pub use context::{RequestContext, SessionCookie};
