//! Built-in template bank

use super::{AnswerLetter::*, CatalogBuilder, Difficulty::*, ItemKind, Template};

const AGREEMENT: &[&str] = &["Strongly Agree", "Agree", "Disagree", "Strongly Disagree"];
const FREQUENCY: &[&str] = &["Always", "Usually", "Sometimes", "Never"];

pub(super) fn builder() -> CatalogBuilder {
    CatalogBuilder::default()
        .templates(ItemKind::Aptitude, aptitude())
        .templates(ItemKind::Personality, personality())
        .templates(ItemKind::Interest, interest())
}

// Skills are interleaved so that cycling from the top mixes them.
fn aptitude() -> Vec<Template> {
    vec![
        Template::scored(
            "If 3 pens cost ₹45, what is the cost of 7 pens?",
            &["₹105", "₹95", "₹115", "₹125"],
            A,
            "quantitative",
            Easy,
        ),
        Template::scored(
            "Complete the pattern: 1, 4, 9, 16, ?",
            &["20", "25", "24", "30"],
            B,
            "logical",
            Easy,
        ),
        Template::scored(
            "Which word is the antonym of 'OPTIMISTIC'?",
            &["Hopeful", "Positive", "Confident", "Pessimistic"],
            D,
            "verbal",
            Easy,
        ),
        Template::scored(
            "If a book costs ₹120 and is sold at 25% profit, what is the selling price?",
            &["₹140", "₹150", "₹160", "₹145"],
            B,
            "quantitative",
            Medium,
        ),
        Template::scored(
            "Complete the series: 3, 7, 15, 31, ?",
            &["47", "55", "63", "71"],
            C,
            "logical",
            Medium,
        ),
        Template::scored(
            "Choose the synonym of 'ABUNDANT':",
            &["Scarce", "Plentiful", "Limited", "Rare"],
            B,
            "verbal",
            Medium,
        ),
        Template::scored(
            "If 15 workers can complete a job in 12 days, how many days will 20 workers take?",
            &["8 days", "9 days", "10 days", "11 days"],
            B,
            "quantitative",
            Medium,
        ),
        Template::scored(
            "If all roses are flowers and some flowers are red, which conclusion is correct?",
            &["All roses are red", "Some roses may be red", "No roses are red", "All flowers are roses"],
            B,
            "logical",
            Medium,
        ),
        Template::scored(
            "Complete the analogy: Book : Author :: Painting : ?",
            &["Canvas", "Brush", "Artist", "Color"],
            C,
            "verbal",
            Easy,
        ),
        Template::scored(
            "A train 150m long crosses a platform 250m long in 20 seconds. What is the speed of the train?",
            &["72 km/hr", "60 km/hr", "80 km/hr", "90 km/hr"],
            A,
            "quantitative",
            Hard,
        ),
        Template::scored(
            "Find the odd one out: Square, Rectangle, Triangle, Circle",
            &["Square", "Rectangle", "Triangle", "Circle"],
            D,
            "logical",
            Easy,
        ),
        Template::scored(
            "Choose the correctly spelled word:",
            &["Accomodate", "Accommodate", "Acommodate", "Acomodate"],
            B,
            "verbal",
            Medium,
        ),
        Template::scored(
            "In a class of 40 students, 60% are boys. If 25% of boys and 20% of girls passed, how many students passed?",
            &["14", "16", "18", "12"],
            A,
            "quantitative",
            Hard,
        ),
        Template::scored(
            "If COMPUTER is coded as RFUVQNPC, how is MONITOR coded?",
            &["SRMGPQM", "SRMGQPM", "SRMHQPM", "SRMGPQN"],
            A,
            "logical",
            Hard,
        ),
        Template::scored(
            "Which word is opposite to 'TRANSPARENT'?",
            &["Clear", "Visible", "Obvious", "Opaque"],
            D,
            "verbal",
            Hard,
        ),
        Template::scored(
            "In a class of 50 students, 30 play cricket and 25 play football. If 10 play both, how many play neither?",
            &["5", "10", "15", "20"],
            A,
            "quantitative",
            Hard,
        ),
    ]
}

fn personality() -> Vec<Template> {
    vec![
        Template::unscored(
            "I enjoy leading team projects and taking responsibility for outcomes",
            AGREEMENT,
            "leadership",
        ),
        Template::unscored("I prefer to have detailed plans before starting any task", FREQUENCY, "planning"),
        Template::unscored(
            "I feel energized when working with people rather than alone",
            &["Strongly Agree", "Agree", "Neutral", "Disagree"],
            "teamwork",
        ),
        Template::unscored(
            "I enjoy analyzing complex problems and finding solutions",
            &["Love it", "Like it", "Neutral", "Dislike it"],
            "analytical",
        ),
        Template::unscored(
            "I feel comfortable expressing my opinions in group discussions",
            &["Very Comfortable", "Comfortable", "Uncomfortable", "Very Uncomfortable"],
            "communication",
        ),
        Template::unscored(
            "I enjoy taking on challenging projects even if there's a risk of failure",
            &["Always", "Often", "Sometimes", "Never"],
            "risk_taking",
        ),
        Template::unscored("When making decisions, I rely more on logic than emotions", AGREEMENT, "decision_making"),
        Template::unscored("I prefer jobs that involve helping other people", AGREEMENT, "social"),
    ]
}

fn interest() -> Vec<Template> {
    vec![
        Template::unscored(
            "Which career field interests you most?",
            &["Technology & IT", "Healthcare", "Business & Finance", "Arts & Design"],
            "career_field",
        ),
        Template::unscored(
            "What type of work environment do you prefer?",
            &["Fast-paced startup", "Stable corporation", "Research institution", "Creative agency"],
            "work_environment",
        ),
        Template::unscored(
            "Which activity would you choose for professional development?",
            &["Technical workshop", "Leadership seminar", "Creative masterclass", "Networking event"],
            "development",
        ),
        Template::unscored(
            "What motivates you most in your career?",
            &["Financial success", "Work-life balance", "Making an impact", "Learning new skills"],
            "motivation",
        ),
        Template::unscored(
            "Which subject did you find most engaging in school?",
            &["Mathematics", "Science", "Literature", "Social Studies"],
            "academic_interest",
        ),
        Template::unscored(
            "In your free time, you prefer:",
            &["Reading books", "Playing sports", "Watching movies", "Learning new skills"],
            "leisure_interest",
        ),
        Template::unscored(
            "Which activity would you choose for a team building exercise?",
            &["Problem-solving game", "Sports competition", "Art workshop", "Debate contest"],
            "team_activity",
        ),
    ]
}
