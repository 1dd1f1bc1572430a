/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod io;
pub use io::{LimitedBufReadExt, LimitedWriteExt};

mod stream;
pub use stream::{StreamCopy, StreamCopyConfig, StreamCopyError};
