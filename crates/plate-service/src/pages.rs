//! Server-rendered HTML pages.

use crate::state::RecognitionReport;

/// Script for the upload preview and the webcam capture page
pub const CAPTURE_SCRIPT: &str = include_str!("../static/scripts.js");

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; background: #f4f6f8; color: #222; }
nav { background: #1d3557; padding: 0.8em 1.5em; }
nav a { color: #fff; margin-right: 1.2em; text-decoration: none; }
main { max-width: 960px; margin: 2em auto; padding: 0 1em; }
.images { display: flex; gap: 1em; flex-wrap: wrap; }
.images figure { flex: 1; min-width: 280px; margin: 0; }
.images img, #image-preview, #video { max-width: 100%; border: 1px solid #ccc; }
pre { background: #fff; padding: 1em; font-size: 1.4em; border: 1px solid #ddd; }
.badge { display: inline-block; padding: 0.3em 0.8em; border-radius: 4px; color: #fff; }
.badge.yes { background: #2a9d8f; }
.badge.no { background: #999; }
"#;

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Nepali License Plate Recognition</title>
<style>{STYLE}</style>
</head>
<body>
<nav>
<a href="/">Home</a>
<a href="/upload">Upload</a>
<a href="/capture">Capture</a>
<a href="/about">About</a>
</nav>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape_html(title),
    )
}

pub fn home() -> String {
    layout(
        "Home",
        r#"<h1>Nepali License Plate Recognition</h1>
<p>Read Nepali license plates from a photo. Plates are located first, then the
characters on each plate are detected and read out both as Latin labels and
in Devanagari script.</p>
<p><a href="/upload">Upload an image</a> or <a href="/capture">capture one with your webcam</a>.</p>"#,
    )
}

pub fn upload_form() -> String {
    layout(
        "Upload",
        r#"<h1>Upload an image</h1>
<form action="/upload" method="post" enctype="multipart/form-data">
<input id="file-input" type="file" name="file" accept="image/*">
<button type="submit">Recognize</button>
</form>
<img id="image-preview" alt="Selected image" style="display:none">
<script src="/static/scripts.js"></script>"#,
    )
}

pub fn capture() -> String {
    layout(
        "Capture",
        r#"<h1>Capture from webcam</h1>
<video id="video" autoplay playsinline></video>
<p>
<button id="capture" type="button">Capture</button>
<button id="process" type="button" style="display:none">Recognize</button>
</p>
<img id="image-preview" alt="Captured frame" style="display:none">
<div id="result" style="display:none">
<h2>Result</h2>
<img id="processed-image" alt="Annotated frame">
<h3>English</h3>
<pre id="english-text"></pre>
<h3>Nepali</h3>
<pre id="nepali-text"></pre>
<p id="bagmati"></p>
</div>
<script src="/static/scripts.js"></script>"#,
    )
}

pub fn about() -> String {
    layout(
        "About",
        r#"<h1>About</h1>
<p>Recognition runs two YOLOv8 detectors: one finds plate regions in the
whole image, the other finds individual characters inside each plate crop.
Characters are grouped into rows by their vertical position and read left to
right.</p>
<p>Plates carrying a Bagmati province marker are flagged.</p>"#,
    )
}

pub fn result(report: &RecognitionReport) -> String {
    let outcome = &report.outcome;
    let bagmati = if outcome.is_bagmati {
        r#"<span class="badge yes">Bagmati province plate</span>"#
    } else {
        r#"<span class="badge no">No Bagmati marker found</span>"#
    };

    let input = report
        .input_image
        .as_deref()
        .map(|input| {
            format!(
                r#"<figure><img src="data:image/jpeg;base64,{input}" alt="Input image"><figcaption>Input</figcaption></figure>"#
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Result</h1>
<div class="images">
{input}
<figure><img src="data:image/jpeg;base64,{processed}" alt="Annotated image"><figcaption>Detections</figcaption></figure>
</div>
<h2>English</h2>
<pre>{english}</pre>
<h2>Nepali</h2>
<pre>{nepali}</pre>
<p>{bagmati}</p>
<p>{plates} plate(s), {characters} character(s) detected.</p>
<p><a href="/upload">Recognize another image</a></p>"#,
        processed = report.processed_image,
        english = escape_html(&outcome.english_text),
        nepali = escape_html(&outcome.nepali_text),
        plates = outcome.plates.len(),
        characters = outcome.characters.len(),
    );

    layout("Result", &body)
}
