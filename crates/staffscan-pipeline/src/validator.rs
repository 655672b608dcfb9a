// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Score validation — structural checks on the engine's MusicXML output.

use std::collections::HashSet;
use std::path::Path;

use roxmltree::{Document, Node, ParsingOptions};
use serde::Serialize;
use staffscan_core::error::Result;
use tracing::{debug, instrument};

/// Decides whether a score file is well-formed and structurally valid.
pub trait ScoreValidator: Send + Sync {
    /// Inspect the file at `path`.
    ///
    /// `Err` only when the file cannot be read at all; structural problems
    /// are reported through the returned [`ValidationReport`].
    fn validate(&self, path: &Path) -> Result<ValidationReport>;
}

/// Outcome of a single structural check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationCheck {
    pub name: &'static str,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ValidationCheck {
    fn pass(name: &'static str) -> Self {
        Self {
            name,
            passed: true,
            detail: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: Some(detail.into()),
        }
    }

    fn from_problem(name: &'static str, problem: Option<String>) -> Self {
        match problem {
            None => Self::pass(name),
            Some(detail) => Self::fail(name, detail),
        }
    }
}

/// Every check run against one score file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    checks: Vec<ValidationCheck>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, check: ValidationCheck) {
        self.checks.push(check);
    }

    pub fn checks(&self) -> &[ValidationCheck] {
        &self.checks
    }

    /// True only when at least one check ran and all of them passed.
    pub fn verdict(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// One-line description of what failed, for error messages.
    pub fn summary(&self) -> String {
        if self.checks.is_empty() {
            return "no checks were run".into();
        }
        let failed: Vec<String> = self
            .failures()
            .map(|c| match &c.detail {
                Some(detail) => format!("{}: {detail}", c.name),
                None => c.name.to_owned(),
            })
            .collect();
        if failed.is_empty() {
            format!("all {} checks passed", self.checks.len())
        } else {
            failed.join("; ")
        }
    }
}

/// Validates uncompressed MusicXML (partwise or timewise).
///
/// Compressed `.mxl` containers are not unpacked and fail the
/// well-formedness check.
#[derive(Debug, Clone, Copy, Default)]
pub struct MusicXmlValidator;

impl MusicXmlValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run all checks on an in-memory document.
    pub fn check_str(&self, xml: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        // MusicXML files routinely carry a DOCTYPE; roxmltree rejects it
        // unless told otherwise.
        let mut options = ParsingOptions::default();
        options.allow_dtd = true;

        let doc = match Document::parse_with_options(xml.trim_start_matches('\u{feff}'), options)
        {
            Ok(doc) => doc,
            Err(err) => {
                report.push(ValidationCheck::fail("well_formed", err.to_string()));
                return report;
            }
        };
        report.push(ValidationCheck::pass("well_formed"));

        let root = doc.root_element();
        let root_name = root.tag_name().name();
        if !matches!(root_name, "score-partwise" | "score-timewise") {
            report.push(ValidationCheck::fail(
                "root_element",
                format!("unexpected root element <{root_name}>"),
            ));
            return report;
        }
        report.push(ValidationCheck::pass("root_element"));

        let declared = declared_part_ids(root);
        report.push(ValidationCheck::from_problem(
            "part_list",
            declared
                .is_empty()
                .then(|| "no <score-part> with an id in <part-list>".to_owned()),
        ));
        report.push(ValidationCheck::from_problem(
            "parts_match",
            undeclared_parts(root, &declared),
        ));

        report.push(ValidationCheck::from_problem("measures", missing_measures(root)));
        report.push(ValidationCheck::from_problem("notes", first_bad_note(root)));

        debug!(parts = declared.len(), "MusicXML structure inspected");
        report
    }
}

impl ScoreValidator for MusicXmlValidator {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn validate(&self, path: &Path) -> Result<ValidationReport> {
        let bytes = std::fs::read(path)?;
        let report = match std::str::from_utf8(&bytes) {
            Ok(xml) => self.check_str(xml),
            Err(err) => {
                let mut report = ValidationReport::new();
                report.push(ValidationCheck::fail(
                    "well_formed",
                    format!("not UTF-8 text: {err}"),
                ));
                report
            }
        };
        debug!(verdict = report.verdict(), "validation finished");
        Ok(report)
    }
}

fn elements<'a, 'input: 'a>(
    root: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    root.descendants()
        .filter(move |node| node.is_element() && node.has_tag_name(name))
}

fn declared_part_ids<'a>(root: Node<'a, '_>) -> Vec<&'a str> {
    root.children()
        .find(|node| node.has_tag_name("part-list"))
        .map(|list| {
            list.children()
                .filter(|node| node.has_tag_name("score-part"))
                .filter_map(|node| node.attribute("id"))
                .filter(|id| !id.trim().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn undeclared_parts(root: Node<'_, '_>, declared: &[&str]) -> Option<String> {
    let present: HashSet<&str> = elements(root, "part")
        .filter_map(|node| node.attribute("id"))
        .collect();
    let missing: Vec<&str> = declared
        .iter()
        .copied()
        .filter(|id| !present.contains(id))
        .collect();
    (!missing.is_empty()).then(|| format!("declared parts without content: {}", missing.join(", ")))
}

/// Partwise scores nest measures in parts; timewise scores nest parts in
/// measures, so only the overall count applies there.
fn missing_measures(root: Node<'_, '_>) -> Option<String> {
    if elements(root, "measure").next().is_none() {
        return Some("score contains no <measure>".to_owned());
    }
    root.children()
        .filter(|node| node.is_element() && node.has_tag_name("part"))
        .find(|part| !part.children().any(|node| node.has_tag_name("measure")))
        .map(|part| {
            format!(
                "part {} has no <measure>",
                part.attribute("id").unwrap_or("<unnamed>")
            )
        })
}

fn first_bad_note(root: Node<'_, '_>) -> Option<String> {
    for (index, note) in elements(root, "note").enumerate() {
        let has_child = |name: &str| note.children().any(|node| node.has_tag_name(name));

        if !(has_child("pitch") || has_child("rest") || has_child("unpitched")) {
            return Some(format!("note {} has no pitch, rest or unpitched", index + 1));
        }
        if has_child("grace") {
            continue;
        }
        let duration = note
            .children()
            .find(|node| node.has_tag_name("duration"))
            .and_then(|node| node.text())
            .and_then(|text| text.trim().parse::<f64>().ok());
        match duration {
            Some(d) if d > 0.0 => {}
            _ => return Some(format!("note {} has no positive duration", index + 1)),
        }
    }
    None
}
