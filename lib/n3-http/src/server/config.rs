/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use crate::build::H1BuilderConfig;

const DEFAULT_MAX_HEADER_SIZE: usize = 16384;
const DEFAULT_MAX_START_LINE_LENGTH: usize = 1024;
const DEFAULT_HWM: usize = 8192;
const DEFAULT_BODY_LINE_MAX_SIZE: usize = 1024;
const DEFAULT_MAX_DECODE_SIZE: usize = 4 << 20;

/// Size budgets for reading a message head off the wire.
#[derive(Debug, Clone, Copy)]
pub struct HeadParseConfig {
    pub max_header_size: usize,
    pub max_start_line_length: usize,
}

impl Default for HeadParseConfig {
    fn default() -> Self {
        HeadParseConfig {
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_start_line_length: DEFAULT_MAX_START_LINE_LENGTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub head: HeadParseConfig,
    pub builder: H1BuilderConfig,
    /// buffer size of intermediate body copies
    pub hwm: usize,
    pub body_line_max_size: usize,
    /// buffered decompression cap, exceeding answers 413
    pub max_decode_size: usize,
    /// per read/write operation deadline
    pub timeout: Duration,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        HttpServerConfig {
            head: HeadParseConfig::default(),
            builder: H1BuilderConfig::default(),
            hwm: DEFAULT_HWM,
            body_line_max_size: DEFAULT_BODY_LINE_MAX_SIZE,
            max_decode_size: DEFAULT_MAX_DECODE_SIZE,
            timeout: Duration::from_secs(15),
        }
    }
}

impl HttpServerConfig {
    pub fn disable_compression(&mut self) {
        self.builder.compression = None;
    }

    pub fn set_compression_level(&mut self, level: u32) {
        self.builder.compression = Some(level);
    }
}
