//! Shader-variant compilation (§4.8): the fixed set of programs a
//! `MaterialShader` maintains, and the textual marker-replacement used to
//! splice user `vertex()`/`fragment()` code into the built-in templates.

/// One compiled program slot in a [`crate::shader::MaterialShader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneVariant {
    Lit,
    Unlit,
    Wireframe,
    Prepass,
    Shadow,
}

pub const SCENE_VARIANT_COUNT: usize = 5;

impl SceneVariant {
    pub const ALL: [SceneVariant; SCENE_VARIANT_COUNT] =
        [Self::Lit, Self::Unlit, Self::Wireframe, Self::Prepass, Self::Shadow];

    pub fn index(self) -> usize {
        match self {
            SceneVariant::Lit => 0,
            SceneVariant::Unlit => 1,
            SceneVariant::Wireframe => 2,
            SceneVariant::Prepass => 3,
            SceneVariant::Shadow => 4,
        }
    }

    pub fn from_shading_mode(shading: crate::material::ShadingMode) -> Self {
        match shading {
            crate::material::ShadingMode::Lit => SceneVariant::Lit,
            crate::material::ShadingMode::Unlit => SceneVariant::Unlit,
            crate::material::ShadingMode::Wireframe => SceneVariant::Wireframe,
        }
    }
}

/// Replaces the first occurrence of `#define vertex()` / `#define
/// fragment()` in `source` with `code`, leaving the built-in stage
/// untouched when `code` is `None` (§4.8's override mechanism).
pub fn splice_user_code(source: &str, marker: &str, code: Option<&str>) -> String {
    match code {
        None => source.to_string(),
        Some(code) => match source.find(marker) {
            Some(pos) => {
                let mut spliced = String::with_capacity(source.len() + code.len());
                spliced.push_str(&source[..pos]);
                spliced.push_str(code);
                spliced.push_str(&source[pos + marker.len()..]);
                spliced
            }
            None => source.to_string(),
        },
    }
}

pub const VERTEX_MARKER: &str = "#define vertex()";
pub const FRAGMENT_MARKER: &str = "#define fragment()";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_replaces_marker_with_user_code() {
        let source = "void main() {\n#define vertex()\n}\n";
        let spliced = splice_user_code(source, VERTEX_MARKER, Some("gl_Position = vec4(0.0);"));
        assert!(spliced.contains("gl_Position = vec4(0.0);"));
        assert!(!spliced.contains(VERTEX_MARKER));
    }

    #[test]
    fn splice_is_no_op_without_user_code() {
        let source = "void main() {\n#define vertex()\n}\n";
        let spliced = splice_user_code(source, VERTEX_MARKER, None);
        assert_eq!(spliced, source);
    }

    #[test]
    fn splice_leaves_source_untouched_when_marker_absent() {
        let source = "void main() {}\n";
        let spliced = splice_user_code(source, VERTEX_MARKER, Some("x"));
        assert_eq!(spliced, source);
    }
}
