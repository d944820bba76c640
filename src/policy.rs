const POLICY_TEMPLATE: &str = r#"<?xml version="1.0"?>
<!DOCTYPE cross-domain-policy SYSTEM "http://www.macromedia.com/xml/dtds/cross-domain-policy.dtd">
<cross-domain-policy>
  <allow-access-from domain="{domain}" to-ports="{ports}" />
</cross-domain-policy>"#;

/// Frame whose trimmed text requests the cross-domain policy document.
pub const POLICY_REQUEST: &str = "<policy-file-request/>";

/// Values substituted into the policy document. Fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub domain: String,
    pub ports: String,
}

impl PolicyConfig {
    /// Renders the policy document. Regenerated per request, never cached.
    pub fn render(&self) -> String {
        POLICY_TEMPLATE
            .replace("{domain}", &self.domain)
            .replace("{ports}", &self.ports)
    }
}
