pub mod request_id;

pub use request_id::{make_request_span, tag_request, RequestId, REQUEST_ID_HEADER};
