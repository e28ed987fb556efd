/// Upper bound the model is asked to respect per test case line.
pub const SUGGESTED_MAX_CHARS: usize = 200;

/// Prompt asking for a numbered list of one-line test cases covering the
/// story. Both inputs are expected to be normalized plain text.
pub fn build_prompt(description: &str, acceptance_criteria: &str) -> String {
    let story = format!("Description: {description}\n\nAcceptance Criteria: {acceptance_criteria}");
    let max = SUGGESTED_MAX_CHARS;

    format!(
        "Generate concise, one-liner test cases in the following format:\n\
         1. <short description - max {max} characters>\n\
         2. <short description - max {max} characters>\n\
         ...\n\
         \n\
         Requirements:\n\
         - Keep each test case description under {max} characters\n\
         - Use clear, actionable language\n\
         - Cover positive, negative, and edge cases\n\
         - Generate comprehensive test coverage\n\
         \n\
         Use the following user story and acceptance criteria to create the test cases:\n\
         {story}\n\
         \n\
         Include all types of test cases: positive, negative, and edge cases. \
         Generate as many relevant test cases as possible to ensure comprehensive coverage"
    )
}
