//! Reader configuration

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::opc::RelationshipFilter;
use crate::parser::{ProgressControl, ProgressStage};

use super::core::Extension;

/// Callback invoked at reading stage transitions and at regular strides
///
/// Returning [`ProgressControl::Abort`] fails the read with
/// [`crate::Error::UserAborted`].
pub type ProgressCallback = Arc<dyn Fn(ProgressStage) -> ProgressControl + Send + Sync>;

/// Default cap on stored warnings
pub const DEFAULT_MAX_WARNINGS: usize = 1000;

/// Configuration for reading 3MF files
///
/// Extensions that are not enabled are handled exactly like unknown namespaces: their
/// elements and attributes are skipped.
///
/// # Example
///
/// ```
/// use lib3mf_core::{Extension, ParserConfig};
///
/// let config = ParserConfig::new()
///     .with_extension(Extension::Material)
///     .with_strict_mode(true);
/// assert!(config.supports(&Extension::Material));
/// assert!(!config.supports(&Extension::Slice));
/// ```
#[derive(Clone)]
pub struct ParserConfig {
    /// Core is always implicitly supported
    supported_extensions: HashSet<Extension>,
    strict_mode: bool,
    max_warnings: usize,
    progress: Option<ProgressCallback>,
    relationship_filter: RelationshipFilter,
    lazy_attachments: bool,
    linked_parts: bool,
}

impl ParserConfig {
    /// Create a new parser configuration with only core support
    pub fn new() -> Self {
        let mut supported = HashSet::new();
        supported.insert(Extension::Core);
        Self {
            supported_extensions: supported,
            strict_mode: false,
            max_warnings: DEFAULT_MAX_WARNINGS,
            progress: None,
            relationship_filter: RelationshipFilter::default(),
            lazy_attachments: false,
            linked_parts: true,
        }
    }

    /// Create a parser configuration that supports all known extensions
    pub fn with_all_extensions() -> Self {
        let mut config = Self::new();
        config.supported_extensions.extend(Extension::ALL);
        config
    }

    /// Add support for a specific extension
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.supported_extensions.insert(extension);
        self
    }

    /// Turn every warning into an error
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Limit the number of stored warnings; later ones are only logged
    pub fn with_max_warnings(mut self, max_warnings: usize) -> Self {
        self.max_warnings = max_warnings;
        self
    }

    /// Install a progress callback
    ///
    /// ```
    /// use std::sync::Arc;
    /// use lib3mf_core::ParserConfig;
    /// use lib3mf_core::parser::{ProgressControl, ProgressStage};
    ///
    /// let config = ParserConfig::with_all_extensions().with_progress_callback(Arc::new(
    ///     |stage: ProgressStage| {
    ///         if stage == ProgressStage::ReadSlices {
    ///             ProgressControl::Abort
    ///         } else {
    ///             ProgressControl::Continue
    ///         }
    ///     },
    /// ));
    /// # let _ = config;
    /// ```
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Select which root relationships are read as attachments
    pub fn with_relationship_filter(mut self, filter: RelationshipFilter) -> Self {
        self.relationship_filter = filter;
        self
    }

    /// Leave attachment payloads in the package until [`crate::model::Attachment::load`]
    pub fn with_lazy_attachments(mut self, lazy: bool) -> Self {
        self.lazy_attachments = lazy;
        self
    }

    /// Load model parts referenced by slice refs and `p:path` (on by default)
    pub fn with_linked_parts(mut self, load: bool) -> Self {
        self.linked_parts = load;
        self
    }

    /// Check if an extension is supported
    pub fn supports(&self, extension: &Extension) -> bool {
        *extension == Extension::Core || self.supported_extensions.contains(extension)
    }

    /// Get the set of supported extensions
    pub fn supported_extensions(&self) -> &HashSet<Extension> {
        &self.supported_extensions
    }

    /// True when warnings fail the read
    pub fn strict_mode(&self) -> bool {
        self.strict_mode
    }

    /// Cap on stored warnings
    pub fn max_warnings(&self) -> usize {
        self.max_warnings
    }

    /// Installed progress callback
    pub fn progress_callback(&self) -> Option<&ProgressCallback> {
        self.progress.as_ref()
    }

    /// Relationship filter for attachments
    pub fn relationship_filter(&self) -> &RelationshipFilter {
        &self.relationship_filter
    }

    /// True when attachment payloads are loaded on demand
    pub fn lazy_attachments(&self) -> bool {
        self.lazy_attachments
    }

    /// True when linked model parts are followed
    pub fn linked_parts(&self) -> bool {
        self.linked_parts
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::with_all_extensions()
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("supported_extensions", &self.supported_extensions)
            .field("strict_mode", &self.strict_mode)
            .field("max_warnings", &self.max_warnings)
            .field("has_progress_callback", &self.progress.is_some())
            .field("relationship_filter", &self.relationship_filter)
            .field("lazy_attachments", &self.lazy_attachments)
            .field("linked_parts", &self.linked_parts)
            .finish()
    }
}
