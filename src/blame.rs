//! Line by line provenance of a merged manifest
//!
//! Every line of the merged document is printed prefixed with its line
//! number. Each element or attribute starting on that line is followed by
//! `<line>--><origin>` naming where it came from.

use merger_actions::Actions;
use merger_xml::{parse, SourceFile, SourceFilePosition, XmlError};
use std::fmt::Write;

use crate::model::instructions::is_ignored_attribute;
use crate::model::{mergeable_elements, node_key};

/// Annotate a merged document with the origin of its elements and attributes
pub fn blame(merged: &str, actions: &Actions) -> Result<String, XmlError> {
    let doc = parse(merged, SourceFile::named("merged"))?;
    let lines: Vec<&str> = merged.lines().collect();
    let mut annotations: Vec<Vec<String>> = vec![Vec::new(); lines.len() + 1];

    for id in mergeable_elements(&doc, doc.root()) {
        let key = node_key(&doc, id);
        if let (Some(line), Some(origin)) = (doc.origin(id).line(), actions.node_origin(&key)) {
            annotate(&mut annotations, line, origin.position());
        }
        for attribute in doc.attributes(id) {
            if is_ignored_attribute(&attribute.name) {
                continue;
            }
            if let (Some(line), Some(origin)) = (
                attribute.origin.line(),
                actions.attribute_origin(&key, &attribute.name),
            ) {
                annotate(&mut annotations, line, origin.position());
            }
        }
    }

    let mut out = String::new();
    for (index, content) in lines.iter().enumerate() {
        let number = index + 1;
        let _ = writeln!(out, "{}{}", number, content);
        for origin in &annotations[number] {
            let _ = writeln!(out, "{}-->{}", number, origin);
        }
    }
    Ok(out)
}

fn annotate(annotations: &mut [Vec<String>], line: u32, origin: &SourceFilePosition) {
    let Some(slot) = annotations.get_mut(line as usize) else {
        return;
    };
    let text = match origin.line() {
        Some(origin_line) => format!("{}:{}", origin.file, origin_line),
        None => origin.file.to_string(),
    };
    if !slot.contains(&text) {
        slot.push(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NullLogger;
    use crate::merge::{merge, MergeRequest};
    use crate::report::MergedDocumentKind;

    fn doc(name: &str, text: &str) -> merger_xml::XmlDocument {
        parse(text, SourceFile::named(name)).unwrap()
    }

    #[test]
    fn test_blame_names_each_source() {
        let main = doc(
            "main.xml",
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.foo">
    <uses-sdk android:minSdkVersion="21" />
    <application android:label="Foo" />
</manifest>"#,
        );
        let lib = doc(
            "lib.xml",
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.lib">
    <uses-sdk android:minSdkVersion="19" />
    <uses-permission android:name="android.permission.INTERNET" />
</manifest>"#,
        );
        let report = merge(MergeRequest::new(main).with_library(lib), &NullLogger);
        let merged = report.merged_document(MergedDocumentKind::Merged).unwrap();
        let blame = blame(merged, report.actions()).unwrap();

        let content_lines: Vec<&str> = blame.lines().filter(|l| !l.contains("-->")).collect();
        assert_eq!(content_lines.len(), merged.lines().count());
        assert!(blame.contains("-->main.xml:1"));
        assert!(blame.contains("-->lib.xml:3"));
    }

    #[test]
    fn test_blame_rejects_malformed_input() {
        let actions = merger_actions::ActionRecorder::new().build();
        assert!(blame("<manifest>", &actions).is_err());
    }

    #[test]
    fn test_annotate_dedupes() {
        let mut annotations = vec![Vec::new(); 3];
        let origin = SourceFilePosition::new(
            SourceFile::named("a.xml"),
            merger_xml::SourcePosition::new(4, 2),
        );
        annotate(&mut annotations, 2, &origin);
        annotate(&mut annotations, 2, &origin);
        annotate(&mut annotations, 7, &origin);
        assert_eq!(annotations[2], vec!["a.xml:4".to_string()]);
    }
}
