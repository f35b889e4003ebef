// Deterministic offline backends
//
// ScaffoldGenerator renders a fixed five-file project from the prompt and is
// the default ProjectGenerator when no remote backend is configured (or the
// remote one fails). OfflineTextGenerator is the matching TextGenerator for chat.

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;
use crate::traits::{GeneratedProject, ProjectGenerator, TextGenerator};
use crate::utils::slugify;

const DEFAULT_TITLE: &str = "AI WebForge Project";
const DEFAULT_TAGLINE: &str = "A locally generated scaffold created by AI-WebForge.";

/// Renders a static frontend plus a minimal Python API
#[derive(Debug, Clone, Default)]
pub struct ScaffoldGenerator;

impl ScaffoldGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render the scaffold synchronously
    pub fn render(&self, prompt: &str) -> GeneratedProject {
        let prompt = prompt.trim();
        let title = if prompt.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            title_case(prompt)
        };
        let slug = slugify(&title);
        let tagline = if prompt.is_empty() { DEFAULT_TAGLINE } else { prompt };

        GeneratedProject::new("scaffold")
            .with_file(
                "public/index.html",
                render_index(&escape_html(&title), &slug, &escape_html(tagline)),
            )
            .with_file("public/static/style.css", STYLE_CSS)
            .with_file("public/static/script.js", SCRIPT_JS)
            .with_file("app/main.py", MAIN_PY)
            .with_file("README.md", render_readme(&title, prompt))
    }
}

#[async_trait]
impl ProjectGenerator for ScaffoldGenerator {
    fn name(&self) -> &str {
        "scaffold"
    }

    async fn generate(&self, prompt: &str) -> Result<GeneratedProject> {
        Ok(self.render(prompt))
    }
}

/// Chat backend used when no remote model is configured
#[derive(Debug, Clone, Default)]
pub struct OfflineTextGenerator;

pub const OFFLINE_REPLY: &str = "AI builder is running in offline mode. Use prompts starting with \
'create' or 'build' to scaffold a project.";

#[async_trait]
impl TextGenerator for OfflineTextGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(OFFLINE_REPLY.to_string())
    }
}

/// Uppercase the first letter of every word, lowercase the rest
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_index(title: &str, slug: &str, tagline: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <link rel="stylesheet" href="./static/style.css">
</head>
<body>
    <main class="container">
        <p class="accent">{slug}</p>
        <h1>{title}</h1>
        <p>{tagline}</p>
        <button id="cta">Launch Experience</button>
    </main>
    <script src="./static/script.js" defer></script>
</body>
</html>"#
    )
}

fn render_readme(title: &str, prompt: &str) -> String {
    format!(
        r#"# {title}

Generated locally by **AI-WebForge** on {generated}.

## Overview

- Prompt: `{prompt}`
- Framework: FastAPI + static frontend assets
- Theme: Dark interface with neon green highlights

## Getting Started

```bash
uvicorn app.main:app --reload
```

Then open http://127.0.0.1:8000 to explore the generated experience."#,
        generated = Utc::now().format("%Y-%m-%d %H:%M UTC"),
    )
}

const STYLE_CSS: &str = r#":root {
    color-scheme: dark;
    font-family: 'Inter', system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
}

body {
    margin: 0;
    padding: 0;
    min-height: 100vh;
    background: radial-gradient(circle at top, #111927 0%, #05070a 100%);
    color: #f8fafc;
    display: flex;
    align-items: center;
    justify-content: center;
}

.container {
    width: min(960px, 90vw);
    padding: 3rem;
    background: rgba(15, 23, 42, 0.85);
    border-radius: 24px;
    border: 1px solid rgba(148, 163, 184, 0.12);
    box-shadow: 0 24px 60px -32px rgba(0, 0, 0, 0.75);
}

.accent {
    color: #00e19a;
    font-weight: 600;
    text-transform: uppercase;
    letter-spacing: 0.18em;
}

button {
    background: linear-gradient(120deg, #00e19a 0%, #11f0aa 100%);
    border: none;
    color: #03110d;
    padding: 0.85rem 1.6rem;
    font-weight: 600;
    border-radius: 999px;
    cursor: pointer;
    transition: transform 150ms ease, box-shadow 150ms ease;
}

button:hover {
    transform: translateY(-1px);
    box-shadow: 0 12px 20px -12px rgba(0, 225, 154, 0.55);
}"#;

const SCRIPT_JS: &str = r#"document.addEventListener('DOMContentLoaded', () => {
    const button = document.querySelector('#cta');
    if (!button) return;
    button.addEventListener('click', () => {
        button.textContent = 'Experience in progress...';
        button.disabled = true;
        setTimeout(() => {
            button.textContent = 'Ready to Launch';
            button.disabled = false;
        }, 1200);
    });
});"#;

const MAIN_PY: &str = r#"'''Minimal FastAPI application for the generated project.'''
from fastapi import FastAPI
from fastapi.responses import HTMLResponse
from pathlib import Path


app = FastAPI(title="Generated App")


@app.get("/", response_class=HTMLResponse)
async def index() -> HTMLResponse:
    html_path = Path(__file__).resolve().parent.parent / "public" / "index.html"
    return HTMLResponse(html_path.read_text(encoding="utf-8"))"#;
