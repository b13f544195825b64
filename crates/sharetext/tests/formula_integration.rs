//! Formula reconstruction through the public tree and markup entry points.

use sharetext::formula::mathml::mathml_str_to_latex;
use sharetext::formula::omml::omml_str_to_latex;
use sharetext::formula::{FormulaNode, to_latex};

#[test]
fn test_fraction_of_runs() {
    let tree = FormulaNode::Fraction {
        numerator: Box::new(FormulaNode::Run("1".to_string())),
        denominator: Box::new(FormulaNode::Run("2".to_string())),
    };
    assert_eq!(to_latex(&tree), "\\frac{1}{2}");
}

#[test]
fn test_unknown_node_renders_its_text() {
    let tree = FormulaNode::Group(vec![
        FormulaNode::Run("a".to_string()),
        FormulaNode::Unknown { text: "+b".to_string() },
    ]);
    assert_eq!(to_latex(&tree), "a+b");
}

#[test]
fn test_deeply_nested_tree_still_renders() {
    let mut tree = FormulaNode::Run("x".to_string());
    for _ in 0..1000 {
        tree = FormulaNode::Group(vec![tree]);
    }
    assert!(to_latex(&tree).contains('x'));
}

#[test]
fn test_omml_and_mathml_agree_on_a_fraction() {
    let omml = r#"<m:oMath xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math"><m:f><m:num><m:r><m:t>1</m:t></m:r></m:num><m:den><m:r><m:t>2</m:t></m:r></m:den></m:f></m:oMath>"#;
    let mathml = r#"<math xmlns="http://www.w3.org/1998/Math/MathML"><mfrac><mn>1</mn><mn>2</mn></mfrac></math>"#;
    assert_eq!(omml_str_to_latex(omml), "\\frac{1}{2}");
    assert_eq!(mathml_str_to_latex(mathml), "\\frac{1}{2}");
}

#[test]
fn test_markup_that_does_not_parse_yields_a_string() {
    assert_eq!(omml_str_to_latex("<m:oMath"), "");
    assert_eq!(mathml_str_to_latex("not xml at all"), "");
}
