//! HTML pages served under `/analyze`.

use crate::pipeline::AnalysisReport;

/// Upload form posted back to `POST /analyze` as `multipart/form-data`.
pub const ANALYZE_FORM: &str = r#"<html>
    <head>
        <title>Analyze URL or PDF</title>
    </head>
    <body>
        <h1>Analyze URL or Upload PDF</h1>
        <form action="/analyze" method="POST" enctype="multipart/form-data">
            <label for="url">Enter URL:</label><br>
            <input type="text" id="url" name="url" placeholder="Enter URL"><br><br>

            <label for="pdf">Upload PDF:</label><br>
            <input type="file" id="pdf" name="pdf" accept=".pdf"><br><br>

            <input type="submit" value="Analyze">
        </form>
    </body>
</html>
"#;

/// Render the results page for a completed analysis. All dynamic text is escaped.
pub fn render_results(report: &AnalysisReport) -> String {
    let stored = report
        .stored_data
        .iter()
        .map(|(classification,)| escape_html(classification))
        .collect::<Vec<_>>()
        .join("<br>");

    format!(
        r#"<html>
    <body>
        <h1>Analysis Results</h1>
        <h2>Source:</h2>
        <p>{source}</p>
        <h2>Extracted Text:</h2>
        <p>{preview}</p>
        <h2>Keywords:</h2>
        <p>{keywords}</p>
        <h2>SDG Classification:</h2>
        <p>{classification}</p>
        <h2>Stored Data:</h2>
        <p>{stored}</p>
        <br><br>
        <a href="/analyze">Back to Analyze</a>
    </body>
</html>
"#,
        source = escape_html(&report.source),
        preview = escape_html(&report.preview),
        keywords = escape_html(&report.keywords.join(", ")),
        classification = escape_html(&report.classification),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
