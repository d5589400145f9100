//! PDF text normalization.
//!
//! Turns the page text of a scientific PDF into one cleaned, heading-annotated
//! block suitable as LLM input. License and copyright lines always survive;
//! running footers, figure/table captions and bare page numbers are dropped;
//! all-caps lines become `## Heading` markers.

use crate::error::{ExtractError, Result};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

static LICENSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(CC[- ]BY|Creative Commons|License|Copyright)").expect("license pattern")
});

static FOOTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(Page\s+\d+|All rights reserved.*)$").expect("footer pattern")
});

static CAPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(Figure|Fig\.|Table)\s*\d+[:.]?").expect("caption pattern")
});

static PAGE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\s*$").expect("page number pattern"));

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z\s\-]{3,}$").expect("heading pattern"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("whitespace pattern"));

/// Name of the append-only log written by [`normalize_dir`]
pub const PROCESSING_LOG: &str = "processing_log.txt";

/// How a single trimmed line is treated. Rules are checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    License,
    Footer,
    Caption,
    PageNumber,
    Heading,
    Body,
}

/// Classify one line of page text.
pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim();
    if line.is_empty() {
        LineKind::Blank
    } else if LICENSE_RE.is_match(line) {
        LineKind::License
    } else if FOOTER_RE.is_match(line) {
        LineKind::Footer
    } else if CAPTION_RE.is_match(line) {
        LineKind::Caption
    } else if PAGE_NUMBER_RE.is_match(line) {
        LineKind::PageNumber
    } else if HEADING_RE.is_match(line) {
        LineKind::Heading
    } else {
        LineKind::Body
    }
}

/// Capitalize the first letter of every alphabetic run and lowercase the rest.
///
/// `"MATERIALS AND METHODS"` becomes `"Materials And Methods"`,
/// `"LONG-TERM TRIAL"` becomes `"Long-Term Trial"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Normalize already-extracted page texts into one cleaned block.
pub fn normalize_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut kept: Vec<String> = Vec::new();

    for page in pages {
        for raw in page.as_ref().lines() {
            let line = raw.trim();
            match classify_line(line) {
                LineKind::License | LineKind::Body => kept.push(line.to_string()),
                LineKind::Heading => kept.push(format!("## {}", title_case(line))),
                LineKind::Blank | LineKind::Footer | LineKind::Caption | LineKind::PageNumber => {}
            }
        }
    }

    let joined = kept.join(" ");
    WHITESPACE_RE.replace_all(&joined, " ").trim().to_string()
}

/// Extract the text of every page of a PDF, in page order.
pub fn read_pdf_pages(path: &Path) -> Result<Vec<String>> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| ExtractError::Pdf(format!("{}: {}", path.display(), e)))?;

    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        let text = doc
            .extract_text(&[*page_number])
            .map_err(|e| ExtractError::Pdf(format!("{} page {}: {}", path.display(), page_number, e)))?;
        pages.push(text);
    }

    debug!(path = %path.display(), pages = pages.len(), "Extracted PDF text");
    Ok(pages)
}

/// Read a PDF and return its normalized text.
pub fn normalize_pdf(path: &Path) -> Result<String> {
    let pages = read_pdf_pages(path)?;
    Ok(normalize_pages(&pages))
}

/// Outcome of a directory run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Markdown files written
    pub written: Vec<PathBuf>,
    /// PDFs that could not be normalized, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// List the PDFs directly inside `dir`, sorted by name.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
        })
        .collect();
    pdfs.sort();
    Ok(pdfs)
}

/// Normalize every PDF in `input_dir` into `<stem>.md` files in `output_dir`.
///
/// A PDF that fails is logged and skipped; the run continues. One block per
/// run is appended to `output_dir/processing_log.txt`.
pub fn normalize_dir(input_dir: &Path, output_dir: &Path) -> Result<BatchReport> {
    fs::create_dir_all(output_dir)?;
    let pdfs = list_pdfs(input_dir)?;
    let mut report = BatchReport::default();

    let mut log = String::new();
    log.push_str(&format!("\n=== Run at {} ===\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
    log.push_str(&format!("Input folder: {}\n\n", input_dir.display()));

    info!(count = pdfs.len(), input = %input_dir.display(), "Normalizing PDFs");

    for pdf in pdfs {
        let name = pdf
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let outcome = normalize_pdf(&pdf).and_then(|text| {
            let target = output_dir.join(markdown_name(&pdf));
            fs::write(&target, text)?;
            Ok(target)
        });

        match outcome {
            Ok(target) => {
                log.push_str(&format!("SUCCESS: Processed {} -> {}\n", name, target.display()));
                report.written.push(target);
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Failed to normalize PDF");
                log.push_str(&format!("ERROR: Failed to process {} - {}\n", name, e));
                report.failed.push((pdf, e.to_string()));
            }
        }
    }

    log.push_str(&format!(
        "\nProcessing completed at {}\nSucceeded: {}, failed: {}\nOutput folder: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        report.written.len(),
        report.failed.len(),
        output_dir.display()
    ));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_dir.join(PROCESSING_LOG))?;
    file.write_all(log.as_bytes())?;

    info!(
        written = report.written.len(),
        failed = report.failed.len(),
        "Normalization complete"
    );
    Ok(report)
}

/// `paper.pdf` -> `paper.md`
pub fn markdown_name(pdf: &Path) -> String {
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    format!("{}.md", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Write a PDF with one text line per `BT`/`ET` block on each page.
    fn write_pdf(path: &Path, pages: &[&[&str]]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in pages {
            let mut operations = Vec::new();
            for (i, line) in lines.iter().enumerate() {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 11.into()]));
                operations.push(Operation::new("Td", vec![72.into(), (760 - 20 * i as i64).into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().expect("encode")));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).expect("save pdf");
    }

    const PAGE_ONE: &[&str] = &[
        "MATERIALS AND METHODS",
        "The Askov trial started in 1894.",
        "Figure 1. Site map",
        "Page 1",
    ];
    const PAGE_TWO: &[&str] = &[
        "Yields were recorded annually.",
        "Table 2 Mean yields",
        "2",
        "Published under a CC BY 4.0 license.",
    ];

    #[test]
    fn test_classify_line_rules() {
        assert_eq!(classify_line("   "), LineKind::Blank);
        assert_eq!(classify_line("© 2024 The Authors. Licensed under CC BY 4.0"), LineKind::License);
        assert_eq!(classify_line("Page 12"), LineKind::Footer);
        assert_eq!(classify_line("All rights reserved by the publisher."), LineKind::Footer);
        assert_eq!(classify_line("Figure 3: Yield over time"), LineKind::Caption);
        assert_eq!(classify_line("Fig. 2. Plot layout"), LineKind::Caption);
        assert_eq!(classify_line("table 1 Soil properties"), LineKind::Caption);
        assert_eq!(classify_line("42"), LineKind::PageNumber);
        assert_eq!(classify_line("MATERIALS AND METHODS"), LineKind::Heading);
        assert_eq!(classify_line("The trial was established in 1878."), LineKind::Body);
    }

    #[test]
    fn test_license_wins_over_footer() {
        // Matches both the copyright and the "All rights reserved" footer rule.
        let line = "Copyright 2021 Elsevier. All rights reserved.";
        assert_eq!(classify_line(line), LineKind::License);
        assert!(normalize_pages(&[line]).contains(line));
    }

    #[test]
    fn test_short_caps_are_body() {
        assert_eq!(classify_line("LTE"), LineKind::Body);
        assert_eq!(classify_line("NPK"), LineKind::Body);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("MATERIALS AND METHODS"), "Materials And Methods");
        assert_eq!(title_case("LONG-TERM FIELD TRIAL"), "Long-Term Field Trial");
    }

    #[test]
    fn test_normalize_pages() {
        let page_one = "STATIC FERTILIZATION EXPERIMENT\n\nThe experiment   started\nin 1902 at Bad Lauchstädt.\n1\n";
        let page_two = "Page 2\nFigure 1. Site map\nYields were recorded annually.\nThis article is distributed under a Creative Commons license.\n";

        let text = normalize_pages(&[page_one, page_two]);
        assert_eq!(
            text,
            "## Static Fertilization Experiment The experiment started in 1902 at Bad Lauchstädt. \
             Yields were recorded annually. This article is distributed under a Creative Commons license."
        );
    }

    #[test]
    fn test_normalized_output_has_no_excluded_fragments() {
        let page = "Page 7\nTable 2 Mean yields\n 13 \nResults show stable SOC.\nCC-BY 4.0";
        let text = normalize_pages(&[page]);
        assert!(!text.contains("Page 7"));
        assert!(!text.contains("Mean yields"));
        assert!(!text.contains("13"));
        assert!(text.contains("CC-BY 4.0"));
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_normalize_empty() {
        let pages: Vec<String> = Vec::new();
        assert_eq!(normalize_pages(&pages), "");
    }

    #[test]
    fn test_unreadable_pdf_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"not a pdf").expect("write");
        assert!(matches!(normalize_pdf(&path), Err(ExtractError::Pdf(_))));
    }

    #[test]
    fn test_normalize_dir_logs_failures_and_continues() {
        let input = tempfile::tempdir().expect("tempdir");
        let output = tempfile::tempdir().expect("tempdir");
        fs::write(input.path().join("a_broken.pdf"), b"garbage").expect("write");
        fs::write(input.path().join("b_broken.PDF"), b"garbage").expect("write");
        fs::write(input.path().join("notes.txt"), b"ignored").expect("write");

        let report = normalize_dir(input.path(), output.path()).expect("batch runs");
        assert!(report.written.is_empty());
        assert_eq!(report.failed.len(), 2);

        let log = fs::read_to_string(output.path().join(PROCESSING_LOG)).expect("log");
        assert!(log.contains("ERROR: Failed to process a_broken.pdf"));
        assert!(log.contains("ERROR: Failed to process b_broken.PDF"));
        assert!(!log.contains("notes.txt"));

        // second run appends
        normalize_dir(input.path(), output.path()).expect("batch runs");
        let log = fs::read_to_string(output.path().join(PROCESSING_LOG)).expect("log");
        assert_eq!(log.matches("=== Run at").count(), 2);
    }

    #[test]
    fn test_normalize_pdf_reads_pages_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("askov.pdf");
        write_pdf(&path, &[PAGE_ONE, PAGE_TWO]);

        let pages = read_pdf_pages(&path).expect("readable pdf");
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("Askov"));
        assert!(pages[1].contains("Yields"));

        let text = normalize_pdf(&path).expect("normalized");
        let heading = text.find("## Materials And Methods").expect("heading");
        let first = text.find("The Askov trial started in 1894.").expect("page one body");
        let second = text.find("Yields were recorded annually.").expect("page two body");
        let license = text.find("CC BY 4.0").expect("license line");
        assert!(heading < first && first < second && second < license);

        assert!(!text.contains("Site map"));
        assert!(!text.contains("Mean yields"));
        assert!(!text.contains("Page 1"));
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_normalize_dir_writes_markdown() {
        let input = tempfile::tempdir().expect("tempdir");
        let output = tempfile::tempdir().expect("tempdir");
        write_pdf(&input.path().join("askov.pdf"), &[PAGE_ONE, PAGE_TWO]);
        fs::write(input.path().join("broken.pdf"), b"garbage").expect("write");

        let report = normalize_dir(input.path(), output.path()).expect("batch runs");
        let target = output.path().join("askov.md");
        assert_eq!(report.written, vec![target.clone()]);
        assert_eq!(report.failed.len(), 1);

        let markdown = fs::read_to_string(&target).expect("markdown written");
        assert!(markdown.starts_with("## Materials And Methods"));
        let log = fs::read_to_string(output.path().join(PROCESSING_LOG)).expect("log");
        assert!(log.contains("SUCCESS: Processed askov.pdf"));
        assert!(log.contains("ERROR: Failed to process broken.pdf"));
    }

    #[test]
    fn test_markdown_name() {
        assert_eq!(markdown_name(Path::new("/data/Raab_2025.pdf")), "Raab_2025.md");
    }
}
