//! XML report of a diff tree.
//!
//! Each node becomes an element named after its kind (`Assembly`, `Module`, `Type`, `Method`,
//! `Field`, `Property`, `Event`, `Accessor`, `AssemblyReference`) with `Name` and `DiffType`
//! attributes. Atomic diffs are grouped in a `DeclarationDiffs` element as `DiffItem` text
//! leaves; child nodes nest directly inside their parent.
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <Assembly Name="Acme" DiffType="Modified">
//!   <Module Name="Acme.dll" DiffType="Modified">
//!     <Type Name="Acme.Widget" DiffType="Modified">
//!       <Method Name="Resize(int, int)" DiffType="Modified">
//!         <DeclarationDiffs>
//!           <DiffItem>Parameter name changed from w to width.</DiffItem>
//!         </DeclarationDiffs>
//!       </Method>
//!     </Type>
//!   </Module>
//! </Assembly>
//! ```

use std::io::Cursor;

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use tracing::warn;

use crate::diff::DiffNode;

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn write(writer: &mut XmlWriter, event: Event<'_>) -> std::io::Result<()> {
    writer.write_event(event)
}

fn write_node(writer: &mut XmlWriter, node: &DiffNode) -> std::io::Result<()> {
    let element = node.kind().to_string();
    let diff_type = node.diff_type().to_string();

    let mut start = BytesStart::new(element.as_str());
    start.push_attribute(("Name", node.name()));
    start.push_attribute(("DiffType", diff_type.as_str()));

    if node.declaration_diffs().is_empty() && node.children().is_empty() {
        return write(writer, Event::Empty(start));
    }

    write(writer, Event::Start(start))?;

    if !node.declaration_diffs().is_empty() {
        write(writer, Event::Start(BytesStart::new("DeclarationDiffs")))?;
        for diff in node.declaration_diffs() {
            let text = diff.to_string();
            write(writer, Event::Start(BytesStart::new("DiffItem")))?;
            write(writer, Event::Text(BytesText::new(&text)))?;
            write(writer, Event::End(BytesEnd::new("DiffItem")))?;
        }
        write(writer, Event::End(BytesEnd::new("DeclarationDiffs")))?;
    }

    for child in node.children() {
        write_node(writer, child)?;
    }

    write(writer, Event::End(BytesEnd::new(element.as_str())))
}

fn render(root: &DiffNode) -> std::io::Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
    )?;
    write_node(&mut writer, root)?;
    Ok(writer.into_inner().into_inner())
}

/// Render a diff tree as an indented UTF-8 XML document. An absent tree renders as an empty
/// string.
#[must_use]
pub fn to_xml(root: Option<&DiffNode>) -> String {
    let Some(root) = root else {
        return String::new();
    };

    match render(root).map(String::from_utf8) {
        Ok(Ok(xml)) => xml,
        Ok(Err(error)) => {
            warn!(%error, "diff report is not valid UTF-8");
            String::new()
        }
        Err(error) => {
            warn!(%error, "failed to render diff report");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        diff::{DeclarationDiff, DeclarationRef, NodeKind},
        metadata::token::Token,
    };

    use super::*;

    fn declaration(table: u8, name: &str) -> DeclarationRef {
        DeclarationRef::new(Token::from_parts(table, 1), name)
    }

    #[test]
    fn empty_tree() {
        assert_eq!(to_xml(None), "");
    }

    #[test]
    fn nested_elements() {
        let method = DiffNode::modified(
            NodeKind::Method,
            "Resize(int, int)",
            declaration(0x06, "Resize"),
            declaration(0x06, "Resize"),
            vec![DeclarationDiff::ParameterNameChanged {
                position: 0,
                old: "w".into(),
                new: "width".into(),
            }],
            vec![],
        )
        .unwrap();
        let added = DiffNode::added(NodeKind::Field, "Count", declaration(0x04, "Count"));
        let ty = DiffNode::modified(
            NodeKind::Type,
            "Acme.Widget<T>",
            declaration(0x02, "Acme.Widget"),
            declaration(0x02, "Acme.Widget"),
            vec![],
            vec![added, method],
        )
        .unwrap();

        let xml = to_xml(Some(&ty));
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<Type Name=\"Acme.Widget&lt;T&gt;\" DiffType=\"Modified\">"));
        assert!(xml.contains("<Field Name=\"Count\" DiffType=\"New\"/>"));
        assert!(xml.contains("<DiffItem>Parameter name changed from w to width.</DiffItem>"));
        assert!(xml.trim_end().ends_with("</Type>"));

        let field = xml.find("<Field").unwrap();
        let method = xml.find("<Method").unwrap();
        assert!(field < method);
    }

    #[test]
    fn reference_elements() {
        let reference = DiffNode::deleted(
            NodeKind::Reference,
            "Acme.Core",
            declaration(0x23, "Acme.Core"),
        );
        assert!(to_xml(Some(&reference))
            .contains("<AssemblyReference Name=\"Acme.Core\" DiffType=\"Deleted\"/>"));
    }
}
