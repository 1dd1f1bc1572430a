/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod config;
pub use config::{HeadParseConfig, HttpServerConfig};

mod error;
pub use error::HttpRequestParseError;

mod request;
pub use request::recv_request_head;

mod driver;
pub use driver::{
    ConnectionContext, H1Driver, HttpServerHandler, plain_error_response,
};
