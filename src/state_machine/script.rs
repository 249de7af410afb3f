//! Canned prompts of the guided dialogue

use super::state::{DialogOption, DialogueStep};

pub const BOARD_PROMPT: &str = "From which board have you attempted your 12th exam?";
pub const COURSES_PROMPT: &str = "Enter the courses to find the colleges that offer them.";
pub const SUBJECT_COUNT_PROMPT: &str = "How many subjects did you study in Class 12? (5 or 6)";
pub const STATE_BOARD_PROMPT: &str =
    "Which state board do you belong to? Please type the name of your state board.";
pub const SUBJECTS_PROMPT: &str = "Please enter the subjects you studied in Class 12.";

/// Assistant prompt and next step for a selected option
pub fn answer(option: DialogOption) -> (&'static str, DialogueStep) {
    match option {
        DialogOption::CheckEligibility => (BOARD_PROMPT, DialogueStep::EligibilityBoard),
        DialogOption::ExploreColleges => (COURSES_PROMPT, DialogueStep::ExploreColleges),
        DialogOption::Cbse | DialogOption::Icse => {
            (SUBJECT_COUNT_PROMPT, DialogueStep::EligibilitySubjects)
        }
        DialogOption::StateBoard => (STATE_BOARD_PROMPT, DialogueStep::StateBoardInquiry),
        DialogOption::FiveSubjects | DialogOption::SixSubjects => {
            (SUBJECTS_PROMPT, DialogueStep::EligibilityCourses)
        }
    }
}

/// Closing message appended when the user ends the chat
pub fn farewell(elapsed: &str, home_url: &str) -> String {
    format!(
        "Thank you for using DU Desk AI Chat Assistant! Your chat duration was {elapsed}. Go Back to the Home Page {home_url}"
    )
}
