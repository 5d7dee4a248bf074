use crate::models::DocType;

/// System and user prompt for one document type.
pub struct Template {
    pub system: &'static str,
    pub prompt: &'static str,
}

const DEFAULT_FEATURES: &str = "Key features will be detailed in the specification.";

pub fn template_for(doc_type: DocType) -> Template {
    match doc_type {
        DocType::TechnicalSpec => Template {
            system: "You are a technical documentation expert creating specifications for software licensing. \
                     Create detailed, professional technical specifications that can be used for licensing \
                     agreements, enterprise sales, technical due diligence, and integration guides.",
            prompt: "Create a comprehensive technical specification document for licensing purposes.

PRODUCT CONTEXT: {context}

KEY FEATURES:
{features}

REQUIRED SECTIONS:
1. **Product Overview** - What it does, target users, key benefits
2. **Technical Architecture** - Components, data flow
3. **System Requirements** - Hardware, software, dependencies
4. **API Specifications** - Endpoints, authentication, rate limits
5. **Security Features** - Encryption, compliance, audit logging
6. **Performance Metrics** - Response times, throughput, scalability
7. **Integration Points** - How it connects with other systems
8. **Support & Maintenance** - SLAs, update cycles, support channels

Make this document professional, detailed, and ready for enterprise licensing discussions.",
        },
        DocType::ApiDoc => Template {
            system: "You create API documentation for licensing and integration.",
            prompt: "Generate complete API documentation for software licensing.

API CONTEXT: {context}

KEY FEATURES:
{features}

MUST INCLUDE:
1. **Authentication** - All auth methods, token management
2. **Rate Limiting** - Limits, quotas, throttling
3. **All Endpoints** - URL, methods, parameters, examples
4. **Request/Response Formats** - JSON schemas, examples
5. **Error Handling** - Error codes, messages, resolution
6. **Performance SLAs** - Response time guarantees

This documentation will be used by technical teams for integration planning.",
        },
        DocType::Changelog => Template {
            system: "You write precise, customer-facing release notes for licensed software.",
            prompt: "Write a changelog entry for the following changes.

CHANGES: {context}

HIGHLIGHTS:
{features}

Group entries under Added, Changed, Fixed, and Removed. Call out breaking changes and \
migration steps explicitly. Keep each entry to one sentence.",
        },
        DocType::Installation => Template {
            system: "You write installation guides for enterprise system administrators.",
            prompt: "Create an installation guide suitable for licensing documentation.

PRODUCT: {context}

COMPONENTS:
{features}

INCLUDE:
1. **Prerequisites** - Supported platforms, dependencies, credentials
2. **Installation Steps** - Numbered, copy-pasteable commands
3. **Configuration** - Required and optional settings
4. **Verification** - How to confirm a working install
5. **Upgrades & Uninstall** - Safe upgrade and removal procedures
6. **Troubleshooting** - Common failures and fixes",
        },
        DocType::ProjectSnapshot => Template {
            system: "You summarize the current state of a software project for licensing due diligence.",
            prompt: "Summarize the current state of this project.

PROJECT ACTIVITY: {context}

NOTABLE WORK:
{features}

COVER:
1. **Scope** - What the project delivers today
2. **Recent Changes** - What moved since the last snapshot
3. **Risks** - Open issues that affect licensing readiness
4. **Next Steps** - Work needed before the next release",
        },
    }
}

impl Template {
    /// Fill `{context}` and `{features}` into the user prompt.
    pub fn render(&self, context: &str, features: Option<&str>) -> String {
        let features = features
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(DEFAULT_FEATURES);
        self.prompt
            .replace("{context}", context)
            .replace("{features}", features)
    }
}
