use crate::models::ResolvedModule;
use crate::report::Renderer;

/// Plain-text notices: packages sorted by name, each block listing the name,
/// the license type and the license text, separated by blank lines. Always ends
/// with a single newline, so an empty group renders as `"\n"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, modules: &[&ResolvedModule]) -> String {
        let mut sorted = modules.to_vec();
        sorted.sort_by(|a, b| a.name().cmp(b.name()));

        let mut out = String::new();
        for module in sorted {
            out.push_str(module.name());
            if let Some(license) = &module.license.license_type {
                out.push('\n');
                out.push_str(license);
            }
            if let Some(text) = &module.license.text {
                out.push('\n');
                out.push_str(text);
            }
            out.push_str("\n\n");
        }

        format!("{}\n", out.trim())
    }
}

/// Name of the per-group notices file.
pub fn group_file_name(group: &str) -> String {
    format!("{}.licenses.txt", group.replace(['/', '\\'], "_"))
}
