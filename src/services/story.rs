use anyhow::Result;

use crate::core::io::Console;
use crate::core::state::Character;
use crate::services::generator::{Generation, StoryGenerator};
use crate::services::input::{ask_integer, ask_text};

const CHOOSE_PROMPT: &str = "Choose 1 or 2 (or type 'exit' to quit): ";

/// A two-way decision in the short story and what each branch asks the model for.
struct ChoiceChapter {
    title: &'static str,
    question: &'static str,
    options: [&'static str; 2],
    outcomes: [&'static str; 2],
}

const SHORT_STORY_CHAPTERS: [ChoiceChapter; 3] = [
    ChoiceChapter {
        title: "Chapter 2: The Choice",
        question: "Your character is faced with a choice:",
        options: ["Explore the mysterious house", "Ignore it and move on"],
        outcomes: [
            "decides to explore the mysterious house. Write what happens next in a darkly comedic style.",
            "decides to ignore the mysterious house and walk away. Write what happens next in a darkly comedic style.",
        ],
    },
    ChoiceChapter {
        title: "Chapter 3: The Dilemma",
        question: "A new dilemma appears:",
        options: ["Trust a stranger's advice", "Forge your own path"],
        outcomes: [
            "decides to trust a stranger's advice. Write what happens next in a darkly comedic style.",
            "decides to forge their own path. Write what happens next in a darkly comedic style.",
        ],
    },
    ChoiceChapter {
        title: "Chapter 4: The Conclusion",
        question: "The journey reaches its peak:",
        options: ["Embrace the chaos", "Seek the truth"],
        outcomes: [
            "chooses to embrace the chaos. Conclude their story in a dark and ironic tone.",
            "seeks the truth. Conclude their story in a dark and ironic tone.",
        ],
    },
];

pub fn intro_prompt(character: &Character) -> String {
    format!(
        "Write an introductory chapter about {}. Use dark humor and existential themes.",
        character
    )
}

pub fn continuation_prompt(character: &Character) -> String {
    format!(
        "Continue the story of {}. Add a new twist, dilemma, or challenge in a darkly comedic style.",
        character
    )
}

pub fn follow_up_prompt(character: &Character, bold: bool) -> String {
    if bold {
        format!(
            "{} takes a bold and risky action. Continue the story with a darkly comedic twist.",
            character.name
        )
    } else {
        format!(
            "{} decides to play it safe but risks missing an opportunity. Continue the story with a darkly comedic twist.",
            character.name
        )
    }
}

pub struct StoryTeller<C: Console> {
    console: C,
    generator: StoryGenerator,
}

impl<C: Console> StoryTeller<C> {
    pub fn new(console: C, generator: StoryGenerator) -> Self {
        Self { console, generator }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Main menu loop. Returns when the user picks "Exit"; a quit token
    /// anywhere surfaces as a `QuitRequested` error.
    pub async fn run(&mut self) -> Result<()> {
        self.console.write_line("\nWelcome to Darkly Ever After!\n");

        loop {
            self.console.write_line("\nMain Menu");
            self.console.write_line("1. Short Story");
            self.console.write_line("2. Ongoing Story");
            self.console.write_line("0. Exit\n");

            let choice = ask_integer(&mut self.console, "Choose an option (1, 2, 0): ", Some(&[1, 2, 0]))?;
            match choice {
                1 => self.short_story().await?,
                2 => self.ongoing_story().await?,
                _ => {
                    self.console
                        .write_line("Goodbye! Thank you for visiting the story generator.\n");
                    return Ok(());
                }
            }
        }
    }

    pub fn setup_character(&mut self) -> Result<Character> {
        let name = ask_text(
            &mut self.console,
            "What is your character's name? (Type 'exit' to quit): ",
            None,
        )?;
        let age = ask_integer(
            &mut self.console,
            "How old is your character? (Type 'exit' to quit): ",
            None,
        )?;
        let profession = ask_text(
            &mut self.console,
            "What does your character do for a living? (Type 'exit' to quit): ",
            None,
        )?;

        Ok(Character { name, age, profession })
    }

    /// Introduction plus three chapters, each preceded by a two-way choice.
    pub async fn short_story(&mut self) -> Result<()> {
        self.console
            .write_line("\nWelcome to your short story experience!\n");

        let character = self.setup_character()?;
        log::info!("Short story started for {}", character);
        self.console.write_line(&format!(
            "\nGreat! {}, is about to embark on an adventure...",
            character
        ));

        let intro = self.generator.generate(&mut self.console, &intro_prompt(&character)).await;
        self.show(None, &intro);

        for chapter in &SHORT_STORY_CHAPTERS {
            let first = self.choose(chapter.question, chapter.options)?;
            let outcome = if first { chapter.outcomes[0] } else { chapter.outcomes[1] };
            let prompt = format!("{} {}", character.name, outcome);

            let generation = self.generator.generate(&mut self.console, &prompt).await;
            self.show(Some(chapter.title), &generation);
        }

        self.console.write_line(
            "Thank you for playing! Remember, life is just a story, and we're all characters in a cosmic joke.\n",
        );
        Ok(())
    }

    /// Beat, choice, follow-up, then ask whether to go on.
    pub async fn ongoing_story(&mut self) -> Result<()> {
        self.console
            .write_line("\nWelcome to your ongoing story experience!\n");

        let character = self.setup_character()?;
        log::info!("Ongoing story started for {}", character);
        self.console.write_line(&format!(
            "\nGreat! {}, is about to embark on an endless adventure...",
            character
        ));

        loop {
            let update = self
                .generator
                .generate(&mut self.console, &continuation_prompt(&character))
                .await;
            self.show(Some("Story Update:"), &update);

            let question = format!("What should {} do next?", character.name);
            let bold = self.choose(
                &question,
                [
                    "Take a bold and risky action",
                    "Play it safe but risk missing an opportunity",
                ],
            )?;

            let next = self
                .generator
                .generate(&mut self.console, &follow_up_prompt(&character, bold))
                .await;
            self.show(Some("Next Chapter:"), &next);

            let answer = ask_text(
                &mut self.console,
                "Would you like to continue the story? (yes or no): ",
                Some(&["yes", "no", "y", "n"]),
            )?;
            if matches!(answer.to_lowercase().as_str(), "no" | "n") {
                self.console.write_line("Ending the story. Thanks for playing!");
                log::info!("Ongoing story ended for {}", character.name);
                return Ok(());
            }
        }
    }

    /// Returns true when the first option was picked.
    fn choose(&mut self, question: &str, options: [&str; 2]) -> Result<bool> {
        self.console.write_line(question);
        self.console.write_line(&format!("1. {}", options[0]));
        self.console.write_line(&format!("2. {}", options[1]));
        let choice = ask_text(&mut self.console, CHOOSE_PROMPT, Some(&["1", "2"]))?;
        Ok(choice == "1")
    }

    fn show(&mut self, heading: Option<&str>, generation: &Generation) {
        match generation {
            Generation::Story(text) => match heading {
                Some(heading) => self.console.write_line(&format!("\n{}\n{}\n", heading, text)),
                None => self.console.write_line(&format!("\n{}\n", text)),
            },
            Generation::Failed(failure) => {
                log::error!("{}", failure);
                self.console.write_line(&format!("\n[story unavailable] {}\n", failure));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::{is_quit, ScriptedConsole};
    use crate::services::llm::{LlmClient, LlmConfig};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    // Mock LLM Client
    #[derive(Debug)]
    struct MockLlmClient {
        prompts: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl MockLlmClient {
        fn new(fail: bool) -> Self {
            Self {
                prompts: Arc::new(Mutex::new(Vec::new())),
                fail,
            }
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn chat(&self, _system: &str, user: &str) -> anyhow::Result<String> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(user.to_string());
            if self.fail {
                return Err(anyhow!("401 invalid api key"));
            }
            Ok(format!("STORY#{}", prompts.len()))
        }
    }

    fn teller(answers: &[&str], llm: MockLlmClient) -> StoryTeller<ScriptedConsole> {
        let generator = StoryGenerator::new(Box::new(llm), &LlmConfig::default(), false);
        StoryTeller::new(ScriptedConsole::new(answers.iter().copied()), generator)
    }

    #[tokio::test]
    async fn test_short_story_generates_four_chapters() -> Result<()> {
        let llm = MockLlmClient::new(false);
        let prompts = llm.prompts.clone();
        let mut teller = teller(&["Mara", "34", "lighthouse keeper", "1", "2", "1"], llm);

        teller.short_story().await?;

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].contains("Mara, a 34-year-old lighthouse keeper"));
        assert!(prompts[1].contains("explore the mysterious house"));
        assert!(prompts[2].contains("forge their own path"));
        assert!(prompts[3].contains("embrace the chaos"));

        let console = teller.console();
        assert_eq!(console.printed("STORY#"), 4);
        assert_eq!(console.printed("Chapter 4: The Conclusion"), 1);
        assert_eq!(console.remaining(), 0);
        Ok(())
    }

    #[test]
    fn test_setup_character_reprompts_invalid_age() -> Result<()> {
        let mut teller = teller(&["  ", "Mara", "old", "34", "lighthouse keeper"], MockLlmClient::new(false));

        let character = teller.setup_character()?;

        assert_eq!(character, Character::new("Mara", 34, "lighthouse keeper"));
        assert_eq!(teller.console().printed("Input cannot be empty"), 1);
        assert_eq!(teller.console().printed("Please enter a valid number."), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_generation_is_not_shown_as_story() -> Result<()> {
        let llm = MockLlmClient::new(true);
        let prompts = llm.prompts.clone();
        let mut teller = teller(&["Mara", "34", "lighthouse keeper", "1", "1", "1"], llm);

        teller.short_story().await?;

        // Four chapters, three attempts each.
        assert_eq!(prompts.lock().unwrap().len(), 12);
        let console = teller.console();
        assert_eq!(console.printed("STORY#"), 0);
        assert_eq!(console.printed("[story unavailable] Error communicating with AI after 3 attempts"), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_ongoing_story_stops_on_no() -> Result<()> {
        let llm = MockLlmClient::new(false);
        let prompts = llm.prompts.clone();
        let mut teller = teller(
            &["Mara", "34", "lighthouse keeper", "1", "YES", "2", "n"],
            llm,
        );

        teller.ongoing_story().await?;

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[1].contains("bold and risky"));
        assert!(prompts[3].contains("play it safe"));
        assert_eq!(teller.console().printed("Ending the story"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_quit_mid_story_propagates() {
        let llm = MockLlmClient::new(false);
        let prompts = llm.prompts.clone();
        let mut teller = teller(&["Mara", "34", "lighthouse keeper", "EXIT"], llm);

        let err = teller.short_story().await.unwrap_err();

        assert!(is_quit(&err));
        assert_eq!(prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_menu_runs_story_then_exits() -> Result<()> {
        let llm = MockLlmClient::new(false);
        let prompts = llm.prompts.clone();
        let mut teller = teller(
            &["3", "x", "1", "Mara", "34", "lighthouse keeper", "1", "2", "1", "0"],
            llm,
        );

        teller.run().await?;

        assert_eq!(prompts.lock().unwrap().len(), 4);
        let console = teller.console();
        assert_eq!(console.printed("Invalid input. Please choose from the valid options."), 1);
        assert_eq!(console.printed("Please enter a valid number."), 1);
        assert_eq!(console.printed("Goodbye!"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_menu_quit_token() {
        let mut teller = teller(&["exit"], MockLlmClient::new(false));
        let err = teller.run().await.unwrap_err();
        assert!(is_quit(&err));
    }
}
