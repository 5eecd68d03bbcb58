mod json_safe;
#[allow(clippy::module_inception)]
mod response;
mod simple;

pub use {
    response::{
        ErrorDetail, ErrorKind, INVALID_UUID_CODE, MISSING_PARAMETER_CODE, PayloadValue, Response,
        ResponseStatus,
    },
    simple::SimpleResponse,
};
