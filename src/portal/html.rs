//! Embedded HTML pages for the configuration portal.

/// Configuration form served at `/`.
pub const FORM_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Configuration</title>
</head>
<body>
    <h1>Configuration</h1>
    <form action="/config" method="post">
        SSID: <input type="text" name="ssid"><br>
        Password: <input type="password" name="password"><br>
        Hostname: <input type="text" name="hostname"><br>
        <input type="submit" value="Save">
    </form>
</body>
</html>
"#;

/// Acknowledgement after a stored submission.
pub const SAVED_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>Configuration Saved</title></head>
<body>
    <h1>Configuration Saved</h1>
    <p>Please restart the device.</p>
</body>
</html>
"#;

/// Page shown when a submission could not be stored.
pub fn failed_html(reason: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"><title>Configuration Not Saved</title></head>\n\
         <body>\n    <h1>Configuration Not Saved</h1>\n    <p>{}</p>\n</body>\n</html>\n",
        escape(reason)
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_fields() {
        for field in ["name=\"ssid\"", "name=\"password\"", "name=\"hostname\""] {
            assert!(FORM_HTML.contains(field), "missing {}", field);
        }
        assert!(FORM_HTML.contains("action=\"/config\" method=\"post\""));
    }

    #[test]
    fn test_failed_page_escapes() {
        let page = failed_html("key <too> long & \"bad\"");
        assert!(page.contains("key &lt;too&gt; long &amp; &quot;bad&quot;"));
    }
}
