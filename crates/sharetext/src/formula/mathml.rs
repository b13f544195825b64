//! Presentation MathML to [`FormulaNode`].
//!
//! OpenDocument stores formula objects as MathML (`Object N/content.xml`).
//! Elements are matched by local name, so documents that omit the MathML
//! namespace are read as well.

use roxmltree::Node;

use super::symbols::is_large_operator;
use super::{BarPosition, FormulaNode, MAX_DEPTH, to_latex};

pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

const FUNCTION_APPLICATION: &str = "\u{2061}";

fn is_mathml(node: &Node) -> bool {
    node.is_element() && matches!(node.tag_name().namespace(), None | Some(MATHML_NAMESPACE))
}

fn local<'a>(node: &Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    node.children().filter(|c| c.is_element()).collect()
}

/// Parse a MathML element (usually `math`).
pub fn parse_mathml(node: Node) -> FormulaNode {
    parse(node, 0)
}

pub fn mathml_to_latex(node: Node) -> String {
    to_latex(&parse_mathml(node))
}

/// Render every outermost `math` element of a document, separated by a space.
pub fn mathml_str_to_latex(xml: &str) -> String {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Skipping unparseable MathML document: {}", e);
            return String::new();
        }
    };

    let is_math = |n: &Node| is_mathml(n) && local(n) == "math";
    doc.descendants()
        .filter(|n| is_math(n) && !n.ancestors().skip(1).any(|a| is_math(&a)))
        .map(mathml_to_latex)
        .filter(|latex| !latex.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse(node: Node, depth: usize) -> FormulaNode {
    if depth > MAX_DEPTH || !is_mathml(&node) {
        return unknown(node);
    }
    let depth = depth + 1;
    let children = elements(node);

    match local(&node) {
        "math" | "mrow" | "mstyle" | "mpadded" | "mphantom" | "merror" => sequence(&children, depth),
        "msqrt" => FormulaNode::sqrt(sequence(&children, depth)),
        "semantics" => children
            .first()
            .map(|first| parse(*first, depth))
            .unwrap_or_else(FormulaNode::empty),
        "mi" | "mn" | "mo" | "mtext" | "ms" => FormulaNode::Run(token_text(node)),
        "mspace" | "annotation" | "annotation-xml" | "none" => FormulaNode::empty(),
        "mfrac" => FormulaNode::fraction(nth(&children, 0, depth), nth(&children, 1, depth)),
        "mroot" => FormulaNode::root(nth(&children, 1, depth), nth(&children, 0, depth)),
        "msup" => FormulaNode::superscript(nth(&children, 0, depth), nth(&children, 1, depth)),
        "msub" => FormulaNode::subscript(nth(&children, 0, depth), nth(&children, 1, depth)),
        "msubsup" => FormulaNode::SubSuperscript {
            base: Box::new(nth(&children, 0, depth)),
            subscript: Box::new(nth(&children, 1, depth)),
            superscript: Box::new(nth(&children, 2, depth)),
        },
        "munder" => under_over(&children, Some(1), None, depth),
        "mover" => under_over(&children, None, Some(1), depth),
        "munderover" => under_over(&children, Some(1), Some(2), depth),
        "mfenced" => FormulaNode::Delimiter {
            open: Some(node.attribute("open").unwrap_or("(").to_string()),
            close: Some(node.attribute("close").unwrap_or(")").to_string()),
            items: children.iter().map(|c| parse(*c, depth)).collect(),
        },
        "mtable" => FormulaNode::Matrix {
            rows: children
                .iter()
                .filter(|row| matches!(local(row), "mtr" | "mlabeledtr"))
                .map(|row| {
                    elements(*row)
                        .into_iter()
                        .filter(|cell| local(cell) == "mtd")
                        .map(|cell| sequence(&elements(cell), depth))
                        .collect()
                })
                .collect(),
        },
        other => {
            tracing::debug!("Unmapped MathML element {}; keeping its text", other);
            unknown(node)
        }
    }
}

/// Parse siblings, folding large operators with their operand and
/// `mi` + U+2061 + operand into function applications.
fn sequence(children: &[Node], depth: usize) -> FormulaNode {
    let mut items = Vec::with_capacity(children.len());
    let mut i = 0;
    while i < children.len() {
        let node = children[i];

        if let Some((operator, lower, upper)) = large_operator(node, depth) {
            let body = children.get(i + 1).map(|b| parse(*b, depth)).unwrap_or_else(FormulaNode::empty);
            items.push(FormulaNode::NAry {
                operator: Some(operator),
                lower: lower.map(Box::new),
                upper: upper.map(Box::new),
                body: Box::new(body),
            });
            i += 2;
            continue;
        }

        if local(&node) == "mi"
            && let Some(apply) = children.get(i + 1)
            && local(apply) == "mo"
            && token_text(*apply) == FUNCTION_APPLICATION
        {
            let argument = children.get(i + 2).map(|a| parse(*a, depth)).unwrap_or_else(FormulaNode::empty);
            items.push(FormulaNode::function(token_text(node), argument));
            i += 3;
            continue;
        }

        items.push(parse(node, depth));
        i += 1;
    }

    if items.len() == 1 {
        items.remove(0)
    } else {
        FormulaNode::Group(items)
    }
}

type Limits = (String, Option<FormulaNode>, Option<FormulaNode>);

/// A large operator glyph, optionally wrapped in a script or under/over element.
fn large_operator(node: Node, depth: usize) -> Option<Limits> {
    let is_op = |n: &Node| local(n) == "mo" && is_large_operator(&token_text(*n));
    if is_op(&node) {
        return Some((token_text(node).trim().to_string(), None, None));
    }

    let (lower_at, upper_at) = match local(&node) {
        "munder" | "msub" => (Some(1), None),
        "mover" | "msup" => (None, Some(1)),
        "munderover" | "msubsup" => (Some(1), Some(2)),
        _ => return None,
    };
    let children = elements(node);
    let base = children.first().filter(|b| is_op(b))?;
    let lower = lower_at.map(|at| nth(&children, at, depth));
    let upper = upper_at.map(|at| nth(&children, at, depth));
    Some((token_text(*base).trim().to_string(), lower, upper))
}

fn under_over(children: &[Node], under: Option<usize>, over: Option<usize>, depth: usize) -> FormulaNode {
    let base = nth(children, 0, depth);
    let mark = |at: Option<usize>| {
        at.and_then(|at| children.get(at))
            .filter(|n| local(n) == "mo")
            .map(|n| token_text(*n))
    };

    match (under, over) {
        (None, Some(_)) => match mark(over) {
            Some(m) if is_bar_mark(&m) => FormulaNode::Bar {
                position: BarPosition::Top,
                base: Box::new(base),
            },
            Some(m) if is_accent_mark(&m) => FormulaNode::Accent {
                mark: Some(m),
                base: Box::new(base),
            },
            _ => FormulaNode::superscript(base, nth(children, 1, depth)),
        },
        (Some(_), None) => match mark(under) {
            Some(m) if is_bar_mark(&m) => FormulaNode::Bar {
                position: BarPosition::Bottom,
                base: Box::new(base),
            },
            _ => FormulaNode::subscript(base, nth(children, 1, depth)),
        },
        _ => FormulaNode::SubSuperscript {
            base: Box::new(base),
            subscript: Box::new(nth(children, 1, depth)),
            superscript: Box::new(nth(children, 2, depth)),
        },
    }
}

fn is_bar_mark(mark: &str) -> bool {
    matches!(mark.trim(), "¯" | "‾" | "_" | "\u{0305}" | "\u{0332}")
}

fn is_accent_mark(mark: &str) -> bool {
    matches!(
        mark.trim(),
        "^" | "ˆ" | "\u{0302}" | "~" | "˜" | "\u{0303}" | "\u{0304}" | "→" | "\u{20D7}" | "˙" | "\u{0307}" | "¨"
            | "\u{0308}" | "˘" | "\u{0306}" | "ˇ" | "\u{030C}" | "´" | "\u{0301}" | "`" | "\u{0300}"
    )
}

fn nth(children: &[Node], at: usize, depth: usize) -> FormulaNode {
    children.get(at).map(|c| parse(*c, depth)).unwrap_or_else(FormulaNode::empty)
}

fn token_text(node: Node) -> String {
    let text: String = node.descendants().filter(|d| d.is_text()).filter_map(|d| d.text()).collect();
    text.trim().to_string()
}

fn unknown(node: Node) -> FormulaNode {
    FormulaNode::Unknown { text: token_text(node) }
}
