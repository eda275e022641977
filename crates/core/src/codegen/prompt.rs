use super::types::CodeRequest;

/// Build the code-generation prompt for a single test summary.
pub fn build_code_prompt(request: &CodeRequest) -> String {
    format!(
        "You are a highly skilled developer writing test code.
Your task is to write a complete, runnable, and high-quality test code block for the provided test case summary.
The test code must be written for the **{framework}** framework.

Summary of the test case:
{summary}

Instructions:
1. The output MUST contain ONLY the code block.
2. The code should be a complete test file, including necessary imports and any required setup or teardown functions.
3. Follow best practices for the specified framework.
4. DO NOT include any explanations, comments, or surrounding text (e.g., \"Here is the code:\", or markdown fences like ```).
",
        framework = request.framework.trim(),
        summary = request.summary.trim(),
    )
}
