//! Allocator configuration
//!
//! Values come from defaults, a TOML document, or `SCOPEALLOC_*` environment
//! variables. Every constructor's result should go through
//! [`AllocatorConfig::validate`] before use; the allocators do this on
//! construction.

use crate::error::{AllocError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// WebAssembly page size.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// How linear memory is extended when an allocation does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPolicy {
    /// Grow by the current page count, i.e. double the memory.
    #[default]
    Doubling,
    /// Grow by exactly the number of missing pages.
    ExactNeed,
}

impl GrowthPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "doubling" | "double" => Some(Self::Doubling),
            "exact_need" | "exact" => Some(Self::ExactNeed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_alignment")]
    pub alignment: usize,

    /// First managed address. Everything below belongs to static data.
    #[serde(default = "default_heap_start")]
    pub heap_start: usize,

    /// Maximum number of live regions.
    #[serde(default = "default_registry_capacity")]
    pub registry_capacity: usize,

    /// Maximum nesting depth in LIFO mode.
    #[serde(default = "default_scope_depth")]
    pub scope_depth: usize,

    #[serde(default)]
    pub growth: GrowthPolicy,
}

fn default_page_size() -> usize {
    WASM_PAGE_SIZE
}

fn default_alignment() -> usize {
    8
}

fn default_heap_start() -> usize {
    WASM_PAGE_SIZE
}

fn default_registry_capacity() -> usize {
    1024 * 1024
}

fn default_scope_depth() -> usize {
    1024
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            alignment: default_alignment(),
            heap_start: default_heap_start(),
            registry_capacity: default_registry_capacity(),
            scope_depth: default_scope_depth(),
            growth: GrowthPolicy::default(),
        }
    }
}

impl AllocatorConfig {
    /// Create config from environment variables
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_usize("SCOPEALLOC_PAGE_SIZE") {
            config.page_size = v;
        }
        if let Some(v) = env_usize("SCOPEALLOC_ALIGNMENT") {
            config.alignment = v;
        }
        if let Some(v) = env_usize("SCOPEALLOC_HEAP_START") {
            config.heap_start = v;
        }
        if let Some(v) = env_usize("SCOPEALLOC_REGISTRY_CAPACITY") {
            config.registry_capacity = v;
        }
        if let Some(v) = env_usize("SCOPEALLOC_SCOPE_DEPTH") {
            config.scope_depth = v;
        }
        if let Some(policy) = std::env::var("SCOPEALLOC_GROWTH")
            .ok()
            .and_then(|v| GrowthPolicy::parse(&v))
        {
            config.growth = policy;
        }

        config
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| AllocError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| AllocError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(AllocError::Config(format!(
                "page_size must be a non-zero power of two, got {}",
                self.page_size
            )));
        }
        if self.alignment == 0 || !self.alignment.is_power_of_two() {
            return Err(AllocError::Config(format!(
                "alignment must be a non-zero power of two, got {}",
                self.alignment
            )));
        }
        if self.alignment > self.page_size {
            return Err(AllocError::Config(format!(
                "alignment {} exceeds page size {}",
                self.alignment, self.page_size
            )));
        }
        if self.heap_start == 0 || self.heap_start % self.alignment != 0 {
            return Err(AllocError::Config(format!(
                "heap_start must be a non-zero multiple of the alignment, got {}",
                self.heap_start
            )));
        }
        if self.registry_capacity == 0 {
            return Err(AllocError::Config("registry_capacity must be positive".into()));
        }
        Ok(())
    }

    /// Round `size` up to the allocation alignment.
    ///
    /// Zero-byte requests take one alignment unit so every allocation has a
    /// distinct address. Returns `None` on overflow.
    #[inline]
    pub fn align(&self, size: usize) -> Option<usize> {
        let size = size.max(1);
        Some(size.checked_add(self.alignment - 1)? & !(self.alignment - 1))
    }

    /// Round `size` up to a whole number of pages.
    #[inline]
    pub fn page_round(&self, size: usize) -> Option<usize> {
        Some(size.checked_add(self.page_size - 1)? & !(self.page_size - 1))
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.trim().parse().ok()
}
