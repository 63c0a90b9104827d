//! Route template parsing.
//!
//! A template is a `/`-separated string using `{name}` for a required
//! parameter, `{name?}` for optional, `{*name}` for catch-all and
//! `{name:constraint}` for typed parameters; everything else is literal
//! text matched case-insensitively.

pub mod error;
pub mod parser;
pub mod route_template;
pub mod segment;


pub use error::TemplateError;
pub use parser::parse_template;
pub use route_template::RouteTemplate;
pub use segment::TemplateSegment;
