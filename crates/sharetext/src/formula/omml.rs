//! Office Math Markup Language (`m:` namespace) to [`FormulaNode`].

use roxmltree::Node;

use super::{BarPosition, FormulaNode, MAX_DEPTH, to_latex};

pub const OMML_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";

fn is_omml(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(OMML_NAMESPACE)
}

/// True for `m:oMath` and `m:oMathPara` elements.
pub fn is_math_root(node: &Node) -> bool {
    is_omml(node, "oMath") || is_omml(node, "oMathPara")
}

/// Parse an OMML element (usually `m:oMath` or `m:oMathPara`).
pub fn parse_omml(node: Node) -> FormulaNode {
    parse(node, 0)
}

/// Parse and render an OMML element.
pub fn omml_to_latex(node: Node) -> String {
    to_latex(&parse_omml(node))
}

/// Render every top-level `m:oMath` in an XML fragment, separated by a space.
/// Unparseable input yields an empty string.
pub fn omml_str_to_latex(xml: &str) -> String {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Skipping unparseable OMML fragment: {}", e);
            return String::new();
        }
    };

    let mut formulas = Vec::new();
    for node in doc.descendants() {
        if is_omml(&node, "oMath") && !node.ancestors().skip(1).any(|a| is_omml(&a, "oMath")) {
            let latex = omml_to_latex(node);
            if !latex.is_empty() {
                formulas.push(latex);
            }
        }
    }
    formulas.join(" ")
}

fn parse(node: Node, depth: usize) -> FormulaNode {
    if depth > MAX_DEPTH {
        return unknown(node);
    }
    let depth = depth + 1;

    if node.tag_name().namespace() != Some(OMML_NAMESPACE) {
        return unknown(node);
    }

    match node.tag_name().name() {
        "oMathPara" | "oMath" | "e" | "num" | "den" | "sub" | "sup" | "deg" | "fName" | "lim" => group(node, depth),
        "r" => FormulaNode::Run(run_text(node)),
        "f" => FormulaNode::Fraction {
            numerator: Box::new(arg(node, "num", depth)),
            denominator: Box::new(arg(node, "den", depth)),
        },
        "rad" => {
            let degree = if flag(node, "radPr", "degHide") {
                None
            } else {
                child(node, "deg").map(|deg| Box::new(group(deg, depth)))
            };
            FormulaNode::Radical {
                degree,
                radicand: Box::new(arg(node, "e", depth)),
            }
        }
        "sSup" => FormulaNode::Superscript {
            base: Box::new(arg(node, "e", depth)),
            exponent: Box::new(arg(node, "sup", depth)),
        },
        "sSub" => FormulaNode::Subscript {
            base: Box::new(arg(node, "e", depth)),
            index: Box::new(arg(node, "sub", depth)),
        },
        "sSubSup" => FormulaNode::SubSuperscript {
            base: Box::new(arg(node, "e", depth)),
            subscript: Box::new(arg(node, "sub", depth)),
            superscript: Box::new(arg(node, "sup", depth)),
        },
        "sPre" => FormulaNode::Group(vec![
            FormulaNode::SubSuperscript {
                base: Box::new(FormulaNode::run("{}")),
                subscript: Box::new(arg(node, "sub", depth)),
                superscript: Box::new(arg(node, "sup", depth)),
            },
            arg(node, "e", depth),
        ]),
        "nary" => {
            let lower = (!flag(node, "naryPr", "subHide"))
                .then(|| child(node, "sub").map(|sub| Box::new(group(sub, depth))))
                .flatten();
            let upper = (!flag(node, "naryPr", "supHide"))
                .then(|| child(node, "sup").map(|sup| Box::new(group(sup, depth))))
                .flatten();
            FormulaNode::NAry {
                operator: property(node, "naryPr", "chr"),
                lower,
                upper,
                body: Box::new(arg(node, "e", depth)),
            }
        }
        "func" => FormulaNode::Function {
            name: Box::new(arg(node, "fName", depth)),
            argument: Box::new(arg(node, "e", depth)),
        },
        "d" => FormulaNode::Delimiter {
            open: property(node, "dPr", "begChr"),
            close: property(node, "dPr", "endChr"),
            items: node
                .children()
                .filter(|c| is_omml(c, "e"))
                .map(|e| group(e, depth))
                .collect(),
        },
        "m" => FormulaNode::Matrix {
            rows: node
                .children()
                .filter(|c| is_omml(c, "mr"))
                .map(|row| row.children().filter(|c| is_omml(c, "e")).map(|e| group(e, depth)).collect())
                .collect(),
        },
        "eqArr" => FormulaNode::Matrix {
            rows: node
                .children()
                .filter(|c| is_omml(c, "e"))
                .map(|e| vec![group(e, depth)])
                .collect(),
        },
        "acc" => FormulaNode::Accent {
            mark: property(node, "accPr", "chr"),
            base: Box::new(arg(node, "e", depth)),
        },
        "bar" => FormulaNode::Bar {
            position: match property(node, "barPr", "pos").as_deref() {
                Some("top") => BarPosition::Top,
                Some(_) => BarPosition::Bottom,
                None => BarPosition::Top,
            },
            base: Box::new(arg(node, "e", depth)),
        },
        "limLow" => FormulaNode::Subscript {
            base: Box::new(arg(node, "e", depth)),
            index: Box::new(arg(node, "lim", depth)),
        },
        "limUpp" => FormulaNode::Superscript {
            base: Box::new(arg(node, "e", depth)),
            exponent: Box::new(arg(node, "lim", depth)),
        },
        "box" | "borderBox" | "phant" | "groupChr" => arg(node, "e", depth),
        other => {
            tracing::debug!("Unmapped OMML element m:{}; keeping its text", other);
            unknown(node)
        }
    }
}

/// Children in order, property elements (`*Pr`) skipped.
fn group(node: Node, depth: usize) -> FormulaNode {
    let mut children: Vec<FormulaNode> = node
        .children()
        .filter(|c| c.is_element() && !c.tag_name().name().ends_with("Pr"))
        .map(|c| parse(c, depth))
        .collect();
    if children.len() == 1 {
        children.remove(0)
    } else {
        FormulaNode::Group(children)
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_omml(c, name))
}

fn arg(node: Node, name: &str, depth: usize) -> FormulaNode {
    child(node, name).map(|c| group(c, depth)).unwrap_or_else(FormulaNode::empty)
}

fn val_attribute(node: Node) -> Option<String> {
    node.attribute((OMML_NAMESPACE, "val"))
        .or_else(|| node.attribute("val"))
        .map(str::to_string)
}

/// `m:val` of `<m:{pr}><m:{name} m:val=".."/></m:{pr}>`.
fn property(node: Node, pr: &str, name: &str) -> Option<String> {
    child(node, pr).and_then(|pr| child(pr, name)).and_then(val_attribute)
}

/// On/off property; a present element without `m:val` is on.
fn flag(node: Node, pr: &str, name: &str) -> bool {
    match child(node, pr).and_then(|pr| child(pr, name)) {
        Some(element) => !matches!(val_attribute(element).as_deref(), Some("0" | "false" | "off")),
        None => false,
    }
}

fn run_text(node: Node) -> String {
    node.descendants()
        .filter(|d| d.is_element() && d.tag_name().name() == "t")
        .filter_map(|t| t.text())
        .collect()
}

fn unknown(node: Node) -> FormulaNode {
    FormulaNode::Unknown {
        text: node.descendants().filter(|d| d.is_text()).filter_map(|d| d.text()).collect(),
    }
}
