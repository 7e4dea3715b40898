//! Renames one exact `option_parser.error(...)` call.

use super::{NewNode, Rewrite, Rule};
use crate::error::{FixerError, Result};
use crate::matcher::Captures;
use crate::pattern::CompiledPattern;
use crate::tree::{is_identifier, NodeId, SyntaxKind, Tree};

/// The only call this rule recognizes, character for character.
const PATTERN: &str = r#"
power<
    'option_parser' trailer< '.' 'error' >
    call=trailer< '('
        term<
            "\"Can't open parameters file (%s). Does it exist? Do you have read access?\""
            '%'
            power< 'opts' trailer< '.' 'parameter_fp' > >
        >
    ')' >
>
"#;

/// Turns the matched call into `<callee>(...)`, keeping the argument trailer.
///
/// Any deviation in the message literal means no match.
pub struct CalleeRename {
    pattern: CompiledPattern,
    callee: String,
}

impl CalleeRename {
    pub const NAME: &'static str = "option_error";

    pub fn new(callee: &str) -> Result<Self> {
        if !is_identifier(callee) {
            return Err(FixerError::InvalidConfig(format!(
                "{} callee must be an identifier, got {callee:?}",
                Self::NAME
            )));
        }
        Ok(Self {
            pattern: CompiledPattern::compile(Self::NAME, PATTERN)?,
            callee: callee.to_string(),
        })
    }
}

impl Rule for CalleeRename {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    fn rewrite(&self, tree: &Tree, node: NodeId, captures: &Captures) -> Result<Rewrite> {
        let call = captures
            .get("call")
            .ok_or_else(|| FixerError::TransformInvariant {
                rule: Self::NAME.to_string(),
                node: format!("{} at {}", tree.kind(node), tree.location(node)),
            })?;
        Ok(Rewrite::Replace {
            node,
            with: NewNode::composite(
                SyntaxKind::Power,
                [
                    NewNode::token(SyntaxKind::Name, self.callee.clone()),
                    NewNode::Existing(*call),
                ],
            ),
        })
    }
}
