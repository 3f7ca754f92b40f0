use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewCategory {
    Functionality,
    CodeQuality,
    Documentation,
    TestCoverage,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryReview {
    #[serde(default)]
    pub score: u8,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Result of the server's automated analysis of a candidate solution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AutomatedReview {
    #[serde(default)]
    pub functionality: CategoryReview,
    #[serde(default)]
    pub code_quality: CategoryReview,
    #[serde(default)]
    pub documentation: CategoryReview,
    #[serde(default)]
    pub test_coverage: CategoryReview,
}

impl AutomatedReview {
    pub fn category(&self, category: ReviewCategory) -> &CategoryReview {
        match category {
            ReviewCategory::Functionality => &self.functionality,
            ReviewCategory::CodeQuality => &self.code_quality,
            ReviewCategory::Documentation => &self.documentation,
            ReviewCategory::TestCoverage => &self.test_coverage,
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = (ReviewCategory, &CategoryReview)> {
        [
            ReviewCategory::Functionality,
            ReviewCategory::CodeQuality,
            ReviewCategory::Documentation,
            ReviewCategory::TestCoverage,
        ]
        .into_iter()
        .map(move |category| (category, self.category(category)))
    }

    pub fn average_score(&self) -> f32 {
        let total: u32 = self
            .categories()
            .map(|(_, review)| u32::from(review.score))
            .sum();
        total as f32 / 4.0
    }

    pub fn has_suggestions(&self) -> bool {
        self.categories()
            .any(|(_, review)| !review.suggestions.is_empty())
    }
}
