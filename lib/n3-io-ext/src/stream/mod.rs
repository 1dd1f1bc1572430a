/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod copy;
pub use copy::{StreamCopy, StreamCopyConfig, StreamCopyError};
