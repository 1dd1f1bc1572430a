/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod ext;
pub use ext::{LimitedBufReadExt, LimitedWriteExt};
