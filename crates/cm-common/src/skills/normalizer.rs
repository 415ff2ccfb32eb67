use std::collections::HashMap;
use std::sync::LazyLock;

use strsim::damerau_levenshtein;
use unicode_normalization::UnicodeNormalization;

/// Variant groups of equivalent skill spellings. The first entry of each
/// group is the canonical form; two tokens are considered the same skill iff
/// they resolve to the same canonical form.
const VARIANT_GROUPS: &[&[&str]] = &[
    // Languages
    &["javascript", "js", "java script", "ecmascript", "es6", "es2015"],
    &["typescript", "ts", "type script"],
    &["python", "python3", "python 3", "py"],
    &["java", "java8", "java11", "java17", "openjdk"],
    &["csharp", "c#", "c sharp", ".net", "dotnet"],
    &["cplusplus", "c++", "cpp", "c plus plus"],
    &["golang", "go", "go lang"],
    &["rust", "rust lang", "rust language"],
    &["ruby", "ruby on rails", "rails", "ror"],
    &["php", "php7", "php8"],
    &["kotlin", "kotlin jvm"],
    &["swift", "ios swift"],
    // Frontend
    &["react", "reactjs", "react.js", "react js"],
    &["vue", "vuejs", "vue.js", "vue js", "vue3"],
    &["angular", "angularjs", "angular.js", "angular2"],
    &["nextjs", "next.js", "next js"],
    &["svelte", "sveltejs", "svelte.js"],
    &["css", "css3", "cascading style sheets"],
    &["sass", "scss"],
    &["tailwind", "tailwindcss", "tailwind css"],
    // Backend & runtimes
    &["nodejs", "node.js", "node js", "node"],
    &["express", "express.js", "expressjs", "express js"],
    &["django", "django rest framework", "drf"],
    &["flask", "python flask"],
    &["fastapi", "fast api"],
    &["spring", "spring boot", "springboot", "spring framework"],
    &["laravel", "php laravel"],
    &["graphql", "graph ql", "gql"],
    &["rest", "rest api", "restful"],
    &["grpc", "g rpc"],
    // Data stores
    &["postgresql", "postgres", "pg", "postgre sql"],
    &["mysql", "my sql", "mariadb"],
    &["mongodb", "mongo", "mongo db"],
    &["redis", "redis cache"],
    &["elasticsearch", "elastic search"],
    &["sqlite", "sqlite3"],
    &["kafka", "apache kafka"],
    // Cloud & ops
    &["aws", "amazon web services", "amazon aws"],
    &["gcp", "google cloud platform", "google cloud"],
    &["azure", "microsoft azure", "ms azure"],
    &["docker", "docker container", "containerization"],
    &["kubernetes", "k8s", "kube"],
    &["terraform", "infrastructure as code", "iac"],
    &["ansible", "configuration management"],
    &["jenkins", "jenkins ci"],
    &["git", "github", "gitlab", "version control"],
    &["cicd", "ci/cd", "ci cd", "continuous integration"],
    // ML / AI
    &["machine learning", "ml"],
    &["deep learning", "deeplearning", "neural networks"],
    &["tensorflow", "tensor flow"],
    &["pytorch", "py torch", "torch"],
    &["nlp", "natural language processing"],
    &["llm", "large language model", "large language models"],
    &["pandas", "python pandas"],
    &["numpy", "numerical python"],
    &["spark", "apache spark"],
    // Mobile
    &["react native", "react-native", "reactnative"],
    &["flutter", "dart flutter"],
    &["android", "android sdk"],
    &["ios", "ios development"],
    // Testing
    &["jest", "jest testing"],
    &["cypress", "cypress testing"],
    &["selenium", "selenium webdriver"],
    &["pytest", "py test"],
];

/// Alias -> canonical lookup built from `VARIANT_GROUPS`.
static ALIAS_TO_CANONICAL: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for group in VARIANT_GROUPS {
        let canonical = group[0];
        for alias in *group {
            map.entry(*alias).or_insert(canonical);
        }
    }
    map
});

/// Same lookup keyed by separator-stripped aliases, so "node.js", "node js"
/// and "nodejs" all resolve through one key.
static COMPACT_ALIAS_TO_CANONICAL: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (alias, canonical) in ALIAS_TO_CANONICAL.iter() {
        map.entry(compact_key(alias)).or_insert(*canonical);
    }
    map
});

/// NFKC-normalize, trim, lowercase. This is the `normalize` operation: a set
/// of already-compliant tokens is a no-op.
pub fn normalize_token(input: &str) -> String {
    input.nfkc().collect::<String>().trim().to_lowercase()
}

fn compact_key(input: &str) -> String {
    input
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '_' | '/' | ','))
        .collect()
}

fn fuzzy_match_canonical(compact: &str) -> Option<&'static str> {
    // Short tokens (java, go, rust) are matched only through the exact alias
    // tables above; fuzzy matching them produces false positives.
    if compact.len() < 5 {
        return None;
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (alias, &canonical) in COMPACT_ALIAS_TO_CANONICAL.iter() {
        if alias.len() < 5 || canonical.len() < 5 {
            continue;
        }

        let distance = damerau_levenshtein(compact, alias);
        let len = compact.len().max(alias.len());
        let acceptable = distance <= 1 || (len >= 8 && distance == 2);
        if !acceptable {
            continue;
        }

        // Equal distances break lexicographically on the canonical form, so
        // an ambiguous typo resolves the same way in every process.
        let better = match best {
            None => true,
            Some((best_canonical, best_distance)) => {
                distance < best_distance
                    || (distance == best_distance && canonical < best_canonical)
            }
        };
        if better {
            best = Some((canonical, distance));
        }
    }

    best.map(|(canonical, _)| canonical)
}

/// Resolve a token to its canonical variant-group form, or return the
/// normalized token itself when it belongs to no configured group.
pub fn canonical_skill(token: &str) -> String {
    let normalized = normalize_token(token);
    if normalized.is_empty() {
        return normalized;
    }

    if let Some(canonical) = ALIAS_TO_CANONICAL.get(normalized.as_str()) {
        return (*canonical).to_string();
    }

    let compact = compact_key(&normalized);
    if let Some(canonical) = COMPACT_ALIAS_TO_CANONICAL.get(&compact) {
        return (*canonical).to_string();
    }

    if let Some(canonical) = fuzzy_match_canonical(&compact) {
        return canonical.to_string();
    }

    normalized
}

/// Lowercase, trim, drop tokens shorter than 2 characters, dedup.
pub fn normalize_skill_set<I, S>(tokens: I) -> crate::skills::SkillSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| normalize_token(token.as_ref()))
        .filter(|token| token.chars().count() >= 2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_forms() {
        assert_eq!(canonical_skill("JS"), "javascript");
        assert_eq!(canonical_skill("JavaScript"), "javascript");
        assert_eq!(canonical_skill("node.js"), "nodejs");
        assert_eq!(canonical_skill("React.js"), "react");
        assert_eq!(canonical_skill("K8s"), "kubernetes");
        assert_eq!(canonical_skill("C#"), "csharp");
    }

    #[test]
    fn separator_variants_share_one_compact_key() {
        assert_eq!(canonical_skill("Node JS"), "nodejs");
        assert_eq!(canonical_skill("react-js"), "react");
        assert_eq!(canonical_skill("CI/CD"), "cicd");
    }

    #[test]
    fn tolerates_small_typos_for_long_aliases() {
        assert_eq!(canonical_skill("javascirpt"), "javascript");
        assert_eq!(canonical_skill("kuberntes"), "kubernetes");
        assert_eq!(canonical_skill("pytroch"), "pytorch");
    }

    #[test]
    fn equidistant_typos_resolve_deterministically() {
        // Two substitutions away from both "javascript" and "typescript";
        // the lexicographically smaller canonical wins the tie.
        assert_eq!(canonical_skill("tyvascript"), "javascript");
    }

    #[test]
    fn does_not_fuzz_short_tokens() {
        assert_eq!(canonical_skill("javaa"), "javaa");
        assert_eq!(canonical_skill("rustt"), "rustt");
        assert_eq!(canonical_skill("goo"), "goo");
    }

    #[test]
    fn java_is_not_javascript() {
        assert_ne!(canonical_skill("java"), canonical_skill("javascript"));
    }

    #[test]
    fn unknown_skills_lowercase_and_trim() {
        assert_eq!(canonical_skill("  MyFramework "), "myframework");
    }

    #[test]
    fn normalize_skill_set_drops_short_tokens_and_dedupes() {
        let set = normalize_skill_set(["Python", "python", " R ", "x", "SQL"]);

        assert!(set.contains("python"));
        assert!(set.contains("sql"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn normalize_is_a_noop_on_compliant_sets() {
        let set = normalize_skill_set(["python", "sql"]);
        let again = normalize_skill_set(set.iter());

        assert_eq!(again.len(), 2);
        assert!(again.contains("python"));
    }
}
