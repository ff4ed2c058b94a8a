//! The external template compiler seam.
//!
//! Template semantics live outside this core. The transformer only needs
//! generated code text and the imports it requires; errors carry a byte
//! range inside the template substring so the driver can remap them onto
//! the host file.

use espalier_sprig::BindingMetadata;
use thiserror::Error;

/// Output of one template compilation.
#[derive(Debug, Clone, Default)]
pub struct CompiledTemplate {
    /// An expression producing the component's render result
    pub code: String,
    /// (specifier, module) imports the generated code needs
    pub imports: Vec<(String, String)>,
}

/// A structured template failure, located inside the template substring.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TemplateError {
    pub message: String,
    /// Byte offset of the problem inside the template text
    pub offset: usize,
}

pub trait TemplateCompiler {
    fn compile(
        &self,
        template: &str,
        scope_id: &str,
        bindings: &BindingMetadata,
    ) -> Result<CompiledTemplate, TemplateError>;
}

/// Stand-in used when no real template compiler is wired up. Renders
/// nothing; binding analysis and transformation still run in full.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTemplateCompiler;

impl TemplateCompiler for NoopTemplateCompiler {
    fn compile(
        &self,
        _template: &str,
        _scope_id: &str,
        _bindings: &BindingMetadata,
    ) -> Result<CompiledTemplate, TemplateError> {
        Ok(CompiledTemplate {
            code: "() => null".to_string(),
            imports: Vec::new(),
        })
    }
}
