//! Prompt construction for initial explanations and follow-up questions

use super::{BillCategory, DetailLevel};

const BRIEF_INSTRUCTIONS: &str = "Summarize the bill in exactly 3 bullet points:
  - What the bill is for
  - The total amount due and the main fees
  - Any charges that look unusual";

const DETAILED_INSTRUCTIONS: &str = "Go through every line item in plain English, covering:
  1. What each charge is for
  2. Subtotals, taxes and fees
  3. Due dates and any late-fee rules
Point out anything that looks unusually high or unclear.";

fn quoted(label: &str, body: &str) -> String {
    format!("{}:\n\"\"\"\n{}\n\"\"\"\n", label, body.trim())
}

fn category_instruction(category: &BillCategory) -> String {
    match category {
        BillCategory::AutoDetect => "Start by identifying what type of bill this is \
             (utility, medical, financial, rent, subscription, insurance, ...)."
            .to_string(),
        other => format!("This is a {} bill.", other),
    }
}

/// Prompt for the first explanation of a bill
pub fn initial(bill_text: &str, level: DetailLevel, category: &BillCategory) -> String {
    let (instructions, tone) = match level {
        DetailLevel::Brief => (BRIEF_INSTRUCTIONS, "concise"),
        DetailLevel::Detailed => (DETAILED_INSTRUCTIONS, "thorough"),
    };

    format!(
        "You are an assistant that explains {subject} in plain language.\n\
         {category}\n\n\
         {bill}\n\
         {instructions}\n\n\
         Be {tone}, clear and well organized.\n",
        subject = category.subject(),
        category = category_instruction(category),
        bill = quoted("Here is the bill text", bill_text),
        instructions = instructions,
        tone = tone,
    )
}

/// Prompt for a follow-up question about an earlier explanation
pub fn follow_up(
    bill_text: &str,
    previous_explanation: &str,
    question: &str,
    category: &BillCategory,
) -> String {
    format!(
        "You are an assistant that explains {subject} in plain language.\n\n\
         {bill}\n\
         {previous}\n\
         {question}\n\
         Answer the follow-up question clearly and briefly, citing the bill text where it helps.\n",
        subject = category.subject(),
        bill = quoted("Here is the bill text", bill_text),
        previous = quoted("Here is your previous explanation", previous_explanation),
        question = quoted("The user asks", question),
    )
}
