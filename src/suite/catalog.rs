//! Declarative suite catalogs.
//!
//! A suite can be described in a YAML file: a base URL plus a list of tests,
//! each navigating to a path and running simple DOM assertions. The catalog
//! compiles into plain [`TestDefinition`]s, so programmatic checks and
//! catalog-driven checks mix freely in one suite.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::{Suite, TestCheck, TestDefinition};
use crate::session::PageHandle;

/// A whole suite as described in a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSpec {
    pub name: String,
    pub base_url: String,
    pub tests: Vec<TestSpec>,
}

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSpec {
    pub id: String,
    pub name: String,
    /// Path appended to the suite's base URL.
    #[serde(default = "default_path")]
    pub path: String,
    /// Viewport override applied before navigation (responsive checks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportSpec>,
    pub assertions: Vec<Assertion>,
}

fn default_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewportSpec {
    pub width: u32,
    pub height: u32,
}

/// DOM assertions the catalog supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Assertion {
    /// At least one element matches the selector.
    ElementExists { selector: String },
    /// Rendered text of the selector (or the whole body) contains `text`.
    TextContains {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        text: String,
    },
    /// At least `min` elements match the selector.
    MinCount { selector: String, min: usize },
}

impl Assertion {
    pub async fn verify(&self, page: &dyn PageHandle) -> Result<()> {
        match self {
            Assertion::ElementExists { selector } => {
                if !page.exists(selector).await? {
                    bail!("element not found: {}", selector);
                }
            }
            Assertion::TextContains { selector, text } => {
                let actual = match selector {
                    Some(sel) => {
                        if !page.exists(sel).await? {
                            bail!("element not found: {}", sel);
                        }
                        page.inner_text(sel).await?
                    }
                    None => page.body_text().await?,
                };
                if !actual.contains(text.as_str()) {
                    bail!("expected text not found: {:?}", text);
                }
            }
            Assertion::MinCount { selector, min } => {
                let found = page.count(selector).await?;
                if found < *min {
                    bail!("expected at least {} of {}, found {}", min, selector, found);
                }
            }
        }
        Ok(())
    }
}

impl SuiteSpec {
    /// Load a suite description from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read suite file: {}", path.display()))?;
        let spec: SuiteSpec = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse suite file: {}", path.display()))?;
        if spec.tests.is_empty() {
            bail!("suite file has no tests: {}", path.display());
        }
        Ok(spec)
    }

    /// Compile the description into runnable definitions.
    pub fn into_suite(self) -> Suite {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        let tests = self
            .tests
            .into_iter()
            .map(|spec| {
                let url = format!("{}{}", base_url, spec.path);
                let check = Arc::new(CatalogCheck {
                    url,
                    viewport: spec.viewport,
                    assertions: spec.assertions,
                });
                TestDefinition::new(spec.id, spec.name, check)
            })
            .collect();
        Suite::new(self.name, tests)
    }
}

/// Check compiled from one [`TestSpec`]: navigate, then assert in order.
struct CatalogCheck {
    url: String,
    viewport: Option<ViewportSpec>,
    assertions: Vec<Assertion>,
}

#[async_trait]
impl TestCheck for CatalogCheck {
    async fn run(&self, page: &dyn PageHandle) -> Result<()> {
        if let Some(viewport) = self.viewport {
            page.set_viewport(viewport.width, viewport.height).await?;
        }
        page.goto(&self.url).await?;
        for assertion in &self.assertions {
            assertion.verify(page).await?;
        }
        Ok(())
    }
}

/// Built-in catalog covering the core journeys of a typical marketing page:
/// initial render, header navigation, content grid, a mobile viewport, and
/// the footer.
pub fn default_suite(base_url: &str) -> Suite {
    SuiteSpec {
        name: "Smoke Test Suite".to_string(),
        base_url: base_url.to_string(),
        tests: vec![
            TestSpec {
                id: "page-load".to_string(),
                name: "Page load and basic rendering".to_string(),
                path: "/".to_string(),
                viewport: None,
                assertions: vec![
                    Assertion::ElementExists {
                        selector: "h1, h2".to_string(),
                    },
                    Assertion::ElementExists {
                        selector: "main, body > div".to_string(),
                    },
                ],
            },
            TestSpec {
                id: "header-navigation".to_string(),
                name: "Header navigation elements".to_string(),
                path: "/".to_string(),
                viewport: None,
                assertions: vec![
                    Assertion::ElementExists {
                        selector: "header".to_string(),
                    },
                    Assertion::MinCount {
                        selector: "header a, nav a".to_string(),
                        min: 2,
                    },
                ],
            },
            TestSpec {
                id: "content-grid".to_string(),
                name: "Content sections display".to_string(),
                path: "/".to_string(),
                viewport: None,
                assertions: vec![
                    Assertion::MinCount {
                        selector: "h3".to_string(),
                        min: 3,
                    },
                    Assertion::MinCount {
                        selector: "button, a[role=\"button\"]".to_string(),
                        min: 1,
                    },
                ],
            },
            TestSpec {
                id: "responsive-mobile".to_string(),
                name: "Responsive design - mobile".to_string(),
                path: "/".to_string(),
                viewport: Some(ViewportSpec {
                    width: 375,
                    height: 667,
                }),
                assertions: vec![
                    Assertion::ElementExists {
                        selector: "h1, h2".to_string(),
                    },
                    Assertion::MinCount {
                        selector: "button, a".to_string(),
                        min: 2,
                    },
                ],
            },
            TestSpec {
                id: "footer".to_string(),
                name: "Footer display and content".to_string(),
                path: "/".to_string(),
                viewport: None,
                assertions: vec![Assertion::ElementExists {
                    selector: "footer".to_string(),
                }],
            },
        ],
    }
    .into_suite()
}
