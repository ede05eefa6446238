pub mod headerparser;
pub mod multipart;
pub mod options;
pub mod orderedheaders;
pub mod redirect;
pub mod request;
pub mod response;
pub mod transaction;
pub mod urlparts;

// Re-exports for convenience
pub use headerparser::{HeaderBlock, HeaderParser, HeaderValue};
pub use multipart::{Form, FormFields, MultipartBuilder, Part, PostBody};
pub use options::{CurlOption, OptionRegistry, OptionValue};
pub use orderedheaders::HeaderTable;
pub use redirect::RedirectResolver;
pub use request::{Method, Request};
pub use response::Response;
pub use transaction::{TransferInfo, Transport};
