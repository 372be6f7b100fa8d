use getrandom::getrandom;

/// Minimal `multipart/form-data` body builder for the upload endpoint.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Result<Self, String> {
        let mut bytes = [0_u8; 12];
        getrandom(&mut bytes)
            .map_err(|err| format!("failed to generate multipart boundary: {err}"))?;
        let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Ok(Self::with_boundary(format!("credisphere-{suffix}")))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn text(&mut self, name: &str, value: &str) {
        self.open_part();
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quoted(name)
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
    }

    pub fn file(&mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) {
        self.open_part();
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                escape_quoted(name),
                escape_quoted(file_name),
                content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }

    fn open_part(&mut self) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .chars()
        .filter(|ch| *ch != '\r' && *ch != '\n')
        .map(|ch| match ch {
            '"' => "%22".to_string(),
            other => other.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_text_and_file_parts() {
        let mut form = MultipartForm::with_boundary("b0");
        form.text("report_id", "rpt-1-0000");
        form.file("files", "statement.pdf", "application/pdf", b"%PDF");
        let (content_type, body) = form.finish();

        assert_eq!(content_type, "multipart/form-data; boundary=b0");
        let body = String::from_utf8(body).expect("utf8");
        assert_eq!(
            body,
            "--b0\r\nContent-Disposition: form-data; name=\"report_id\"\r\n\r\nrpt-1-0000\r\n\
             --b0\r\nContent-Disposition: form-data; name=\"files\"; filename=\"statement.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF\r\n\
             --b0--\r\n"
        );
    }

    #[test]
    fn file_names_cannot_break_out_of_the_header() {
        assert_eq!(escape_quoted("a\"b\r\n.pdf"), "a%22b.pdf");
    }

    #[test]
    fn random_boundaries_differ() {
        let a = MultipartForm::new().expect("form").finish().0;
        let b = MultipartForm::new().expect("form").finish().0;
        assert_ne!(a, b);
    }
}
