/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::HttpLineParseError;

mod header_line;
pub use header_line::HttpHeaderLine;

mod request_line;
pub use request_line::HttpRequestLine;

mod status_line;
pub use status_line::HttpStatusLine;

mod chunked_line;
pub use chunked_line::HttpChunkedLine;
