//! Built-in lead questionnaire

use super::graph::{GraphError, StepGraph};
use super::step::{Choice, Step};

pub const ENTRY_STEP: &str = "intro";

/// The dealership lead flow: vehicle type, budget, timeframe, contact method
pub fn lead_questionnaire() -> Result<StepGraph, GraphError> {
    StepGraph::new(
        ENTRY_STEP,
        vec![
            Step::choice_list(
                "intro",
                "Welcome to Tekion Auto! I'm your AI Concierge. I can help you find your dream car in seconds. Ready to get started?",
                vec![
                    Choice::new("Yes, let's go!", "start", "vehicle_class"),
                    Choice::new("Just browsing", "browsing", "browsing_response"),
                ],
            ),
            Step::choice_grid(
                "vehicle_class",
                "Exciting! First, what type of vehicle fits your lifestyle?",
                vec![
                    Choice::new("Sedan", "sedan", "budget"),
                    Choice::new("SUV", "suv", "budget"),
                    Choice::new("Sports", "sports", "budget"),
                    Choice::new("EV", "ev", "budget"),
                    Choice::new("Used", "used", "budget"),
                ],
            ),
            Step::currency_input(
                "budget",
                "Great choice. What is your estimated budget for this vehicle?",
                "timeframe",
            ),
            Step::choice_list(
                "timeframe",
                "Noted. When are you hoping to park this in your driveway?",
                vec![
                    Choice::new("Immediately", "immediate", "communication"),
                    Choice::new("Less than 1 month", "<1mo", "communication"),
                    Choice::new("1-3 months", "1-3mo", "communication"),
                    Choice::new("Just exploring", "exploring", "communication"),
                ],
            ),
            Step::choice_grid(
                "communication",
                "Last step! How would you prefer us to reach out with matches?",
                vec![
                    Choice::new("Call", "call", "closing"),
                    Choice::new("Text", "text", "closing"),
                    Choice::new("Email", "email", "closing"),
                    Choice::new("WhatsApp", "whatsapp", "closing"),
                ],
            ),
            Step::terminal(
                "closing",
                "Perfect! I've curated a list of vehicles matching your criteria. A specialist is reviewing them now.",
            ),
            Step::terminal(
                "browsing_response",
                "No problem! Feel free to explore our inventory using the menu. I'm here if you need me.",
            ),
        ],
    )
}
