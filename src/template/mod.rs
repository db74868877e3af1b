pub mod generalize;

use std::collections::BTreeSet;

/// How many positions of a template may be Variable at once.
///
/// Promotion of a mismatching Fixed position only happens while the
/// template's Variable count is below this. With the default of 1, a shape
/// with two independently varying segments either splits into several
/// templates or flips which segment is variable depending on arrival order;
/// that is accepted behavior, and this constant is the only knob for
/// changing it.
pub const MAX_VARIABLE_SEGMENTS: usize = 1;

/// One position of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Expected to be the same literal across all URLs of the template
    Fixed { example: String },

    /// Known to vary; holds every concrete value observed so far
    Variable { examples: BTreeSet<String> },
}

impl Segment {
    pub fn is_variable(&self) -> bool {
        matches!(self, Segment::Variable { .. })
    }
}

/// A generalized path shape: one structural URL "kind" on a crawled site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

/// The growing list of discovered templates and the matching algorithm
/// over them.
///
/// URLs handed to the store are already normalized and generalized; they are
/// split on `/` with empty segments dropped, so the scheme token and host
/// are ordinary fixed segments.
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: Vec<Template>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn into_templates(self) -> Vec<Template> {
        self.templates
    }

    /// Record a URL as a brand-new all-Fixed template
    pub fn insert(&mut self, url: &str) {
        let segments = url
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| Segment::Fixed {
                example: segment.to_string(),
            })
            .collect();

        self.templates.push(Template { segments });
    }

    /// Match a URL against the known templates.
    ///
    /// Only templates with the same segment count are considered. A Variable
    /// position always matches and absorbs the concrete value into its
    /// example set as a side effect of the scan; a Fixed position matches on
    /// exact equality. A template with exactly one mismatching position is
    /// reconciled by promoting that position to Variable, provided the
    /// template still has room under [`MAX_VARIABLE_SEGMENTS`].
    ///
    /// Returns the index of the matching template, or `None` if the URL
    /// belongs to no known shape (the caller then calls [`insert`] and
    /// re-enqueues the URL).
    ///
    /// [`insert`]: TemplateStore::insert
    pub fn match_url(&mut self, url: &str) -> Option<usize> {
        let segments: Vec<&str> = url.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return None;
        }

        for (index, template) in self.templates.iter_mut().enumerate() {
            if template.segments.len() != segments.len() {
                continue;
            }

            let mut mismatches = Vec::new();
            for (position, (segment, template_segment)) in
                segments.iter().zip(template.segments.iter_mut()).enumerate()
            {
                match template_segment {
                    Segment::Fixed { example } => {
                        if example.as_str() != *segment {
                            mismatches.push(position);
                        }
                    }
                    Segment::Variable { examples } => {
                        // Absorbed even when the template ends up rejected;
                        // the example set only ever grows.
                        examples.insert((*segment).to_string());
                    }
                }
            }

            if mismatches.is_empty() {
                return Some(index);
            }

            if mismatches.len() == 1 {
                let variable_count = template
                    .segments
                    .iter()
                    .filter(|s| s.is_variable())
                    .count();

                if variable_count < MAX_VARIABLE_SEGMENTS {
                    let position = mismatches[0];
                    // A mismatch is only recorded at Fixed positions, so
                    // this always takes the promotion path.
                    if let Segment::Fixed { example } = &template.segments[position] {
                        let mut examples = BTreeSet::new();
                        examples.insert(example.clone());
                        examples.insert(segments[position].to_string());
                        template.segments[position] = Segment::Variable { examples };
                        return Some(index);
                    }
                }
            }
        }

        None
    }
}
