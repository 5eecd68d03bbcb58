mod response;
mod support;
