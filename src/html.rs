use crate::error::AutoPlaceError;
use crate::inline_style::{InlineStyle, declared_size};
use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;

#[derive(Debug, Clone)]
pub struct HtmlLayoutWarning {
    pub kind: String,
    pub message: String,
    pub details: Vec<String>,
}

pub(crate) fn parse_document(html: &str) -> NodeRef {
    kuchiki::parse_html().one(html)
}

pub(crate) fn select_containers(
    document: &NodeRef,
    selector: &str,
) -> Result<Vec<NodeRef>, AutoPlaceError> {
    let matches = document
        .select(selector)
        .map_err(|()| AutoPlaceError::ContainerNotFound(selector.to_string()))?;
    let containers: Vec<NodeRef> = matches.map(|m| m.as_node().clone()).collect();
    if containers.is_empty() {
        return Err(AutoPlaceError::ContainerNotFound(selector.to_string()));
    }
    Ok(containers)
}

pub(crate) fn serialize(node: &NodeRef) -> Result<String, AutoPlaceError> {
    let mut buf: Vec<u8> = Vec::new();
    node.serialize(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub(crate) fn serialize_children(node: &NodeRef) -> Result<String, AutoPlaceError> {
    let mut buf: Vec<u8> = Vec::new();
    for child in node.children() {
        child.serialize(&mut buf)?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Flag markup the height estimator can only guess at.
pub fn scan_layout_warnings(container: &NodeRef, img_selector: &str) -> Vec<HtmlLayoutWarning> {
    let mut warnings = Vec::new();

    let mut unsized_images = Vec::new();
    if let Ok(images) = container.select(img_selector) {
        for image in images {
            let node = image.as_node();
            if *node == *container {
                continue;
            }
            let attrs = image.attributes.borrow();
            let declared = declared_size(&InlineStyle::of(node).to_attr());
            let has_width = attrs.get("width").is_some() || declared.width.is_some();
            let has_height = attrs.get("height").is_some() || declared.height.is_some();
            let inline_src = attrs
                .get("src")
                .map(|src| src.trim_start().starts_with("data:"))
                .unwrap_or(false);
            if !has_width && !has_height && !inline_src {
                unsized_images.push(attrs.get("src").unwrap_or("").to_string());
            }
        }
    }
    if !unsized_images.is_empty() {
        warnings.push(HtmlLayoutWarning {
            kind: "image-size".to_string(),
            message: format!(
                "{} image(s) declare no width or height; heights are resolved from the image file or a 150px default.",
                unsized_images.len()
            ),
            details: unsized_images,
        });
    }

    let style = InlineStyle::of(container);
    if declared_size(&style.to_attr()).height.is_some() {
        warnings.push(HtmlLayoutWarning {
            kind: "fixed-height".to_string(),
            message: "Container declares a fixed height; placement thresholds past it are never reached.".to_string(),
            details: Vec::new(),
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_lookup_reports_missing_and_invalid_selectors() {
        let doc = parse_document(r#"<div class="col">a</div><div class="col">b</div>"#);
        assert_eq!(select_containers(&doc, ".col").expect("cols").len(), 2);
        assert!(matches!(
            select_containers(&doc, "#missing"),
            Err(AutoPlaceError::ContainerNotFound(_))
        ));
        assert!(matches!(
            select_containers(&doc, "div[["),
            Err(AutoPlaceError::ContainerNotFound(_))
        ));
    }

    #[test]
    fn children_serialize_without_wrapper() {
        let doc = parse_document(r#"<p>one</p><img src="a.png">"#);
        let body = doc.select_first("body").expect("body");
        assert_eq!(
            serialize_children(body.as_node()).expect("serialize"),
            r#"<p>one</p><img src="a.png">"#
        );
    }

    #[test]
    fn warnings_flag_unsized_images_and_fixed_height() {
        let doc = parse_document(
            r#"<div id="c" style="height: 300px"><img src="a.png"><img src="b.png" width="20"><img src="data:image/png;base64,AAAA"></div>"#,
        );
        let container = doc.select_first("#c").expect("container");
        let warnings = scan_layout_warnings(container.as_node(), "img");
        let kinds: Vec<&str> = warnings.iter().map(|w| w.kind.as_str()).collect();
        assert_eq!(kinds, vec!["image-size", "fixed-height"]);
        assert_eq!(warnings[0].details, vec!["a.png".to_string()]);
    }
}
