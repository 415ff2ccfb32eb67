use super::normalizer::normalize_token;
use super::SkillSet;

/// Common technology names scanned over free-text job descriptions when a
/// job carries no structured skill lists. Multi-word entries are matched as
/// substrings of the normalized text.
const COMMON_TECHNOLOGIES: &[&str] = &[
    "javascript",
    "typescript",
    "python",
    "java",
    "golang",
    "rust",
    "ruby",
    "php",
    "kotlin",
    "swift",
    "react",
    "angular",
    "vue",
    "svelte",
    "node.js",
    "nodejs",
    "django",
    "flask",
    "fastapi",
    "spring",
    "rails",
    "laravel",
    "graphql",
    "postgresql",
    "postgres",
    "mysql",
    "mongodb",
    "redis",
    "elasticsearch",
    "kafka",
    "aws",
    "gcp",
    "azure",
    "docker",
    "kubernetes",
    "terraform",
    "ansible",
    "jenkins",
    "machine learning",
    "deep learning",
    "tensorflow",
    "pytorch",
    "pandas",
    "spark",
    "flutter",
    "react native",
];

/// Substring-scan the fixed vocabulary over free text. Word boundaries are
/// deliberately loose; this path exists only as a fallback for jobs with no
/// structured skill lists.
pub fn scan_vocabulary(text: &str) -> SkillSet {
    let haystack = normalize_token(text);
    if haystack.is_empty() {
        return SkillSet::new();
    }

    COMMON_TECHNOLOGIES
        .iter()
        .filter(|term| haystack.contains(*term))
        .map(|term| term.to_string())
        .collect()
}
