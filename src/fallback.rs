//! Deterministic, offline story content.
//!
//! Used whenever the live pipeline is unavailable or gives up. Templates are
//! immutable static data; every call renders a fresh, correctly shaped copy,
//! so concurrent requests never observe each other's padding or truncation.
//!
//! Shape guarantees for any request:
//! - `story.len() == sentence_count(story_length)`
//! - `image_prompts.len() == story.len() / 2`
//! - `images.len() == image_prompts.len()`, every entry `None`

use crate::story::StoryDocument;
use crate::types::{image_count, StoryRequest, Theme};
use tracing::info;

const NAME: &str = "{name}";

const FILLER_SENTENCE: &str =
    "{name} had an amazing adventure and couldn't wait to tell everyone about it.";
const FILLER_PROMPT: &str = "{name} having a wonderful adventure in a magical {theme} setting.";

struct Template {
    theme: Theme,
    title: &'static str,
    moral: &'static str,
    story: [&'static str; 8],
    image_prompts: [&'static str; 4],
}

static FOREST: Template = Template {
    theme: Theme::Forest,
    title: "{name}'s Magical Forest Adventure",
    moral: "Kindness to nature brings unexpected friends and rewards.",
    story: [
        "One sunny morning, {name} decided to explore the magical forest near their home.",
        "The trees whispered secrets as {name} walked deeper into the woods, discovering a hidden path covered with golden leaves.",
        "Suddenly, a small fox with bright blue eyes appeared and bowed to {name}, saying, 'We've been waiting for you, special one!'",
        "The fox led {name} to a clearing where animals of all kinds had gathered around an ancient oak tree that sparkled with tiny lights.",
        "'Our forest is losing its magic,' explained the wise old owl perched on a branch, 'and you have the kind heart needed to help restore it.'",
        "{name} gently placed their hands on the ancient tree, and immediately felt a warm glow spreading through their fingers.",
        "As {name} closed their eyes and wished for the forest's magic to return, colorful beams of light shot from their fingertips into the sky.",
        "The animals cheered as the forest came alive with vibrant colors and magical creatures, and they named {name} their forever friend and protector of the forest.",
    ],
    image_prompts: [
        "A child named {name} walking into a magical forest with sunlight streaming through the trees and tiny glowing sprites hiding among the leaves",
        "A friendly fox with bright blue eyes bowing to {name} on a path covered with golden leaves in an enchanted forest",
        "{name} standing in a forest clearing surrounded by woodland animals gathered around a giant ancient oak tree that sparkles with magical lights",
        "{name} with hands on a magical tree trunk, colorful beams of light shooting from their fingertips into the sky as forest animals watch in amazement",
    ],
};

static SPACE: Template = Template {
    theme: Theme::Space,
    title: "{name}'s Cosmic Journey",
    moral: "Courage and friendship can overcome any challenge in the universe.",
    story: [
        "{name} was gazing at the stars through their telescope when a small, glowing spaceship landed in their backyard.",
        "A friendly alien with purple skin and three eyes emerged, introducing itself as Zorb from the planet Lumina.",
        "'We need your help,' Zorb explained to {name}, 'our planet's cosmic crystal is fading, and without it, our world will lose all its light.'",
        "Without hesitation, {name} climbed aboard the spaceship, which zoomed through the galaxy past swirling nebulae and shooting stars.",
        "When they arrived at Lumina, {name} was amazed to see floating cities and rainbow bridges connecting crystal mountains.",
        "The planet's elders showed {name} the dying crystal at the planet's core, which had lost its sparkle and glow.",
        "{name} remembered the special stardust they had collected from a meteor shower and sprinkled it gently over the cosmic crystal.",
        "The crystal immediately burst into brilliant light, saving Lumina, and the grateful aliens made {name} an honorary citizen of their world, promising they would always be friends across the stars.",
    ],
    image_prompts: [
        "A child named {name} looking through a telescope at night when a small glowing spaceship lands in their backyard with stars twinkling in the sky",
        "{name} meeting a friendly purple alien with three eyes named Zorb who has emerged from a spaceship with cosmic light surrounding them",
        "{name} and alien Zorb flying through space in a glowing spaceship, passing colorful nebulae, planets, and shooting stars",
        "{name} sprinkling magical stardust over a large crystal at the core of an alien planet, with the crystal bursting into brilliant rainbow light",
    ],
};

static OCEAN: Template = Template {
    theme: Theme::Ocean,
    title: "{name} and the Underwater Kingdom",
    moral: "True friendship means helping others in need, no matter how different they may be.",
    story: [
        "{name} was playing at the beach when they discovered a beautiful shell that glowed with an otherworldly blue light.",
        "When {name} picked up the shell, it transformed into a magical pendant that allowed them to breathe underwater.",
        "Curious and excited, {name} waded into the ocean and dove beneath the waves, discovering an entire kingdom of merpeople living in coral palaces.",
        "The Mer-King approached {name} and explained that their kingdom was in danger from a dark shadow that was poisoning their waters.",
        "'Only someone from the surface world with a pure heart can help us,' said the Mer-King, showing {name} how the shadow was spreading through their beautiful home.",
        "Determined to help, {name} followed the source of the darkness to an old shipwreck where plastic waste from the human world had collected.",
        "Using the magic of the pendant, {name} created a whirlpool that gathered all the pollution into a ball that they could remove from the ocean.",
        "The grateful merpeople celebrated {name}'s bravery with an underwater festival of lights, and promised that anytime {name} returned to the sea, they would be welcomed as a hero.",
    ],
    image_prompts: [
        "A child named {name} at the beach finding a beautiful shell that glows with magical blue light in their hands",
        "{name} swimming underwater wearing a glowing blue pendant, approaching a magnificent coral palace where merpeople live",
        "{name} and the Mer-King looking concerned at a dark shadow spreading through the colorful underwater kingdom",
        "{name} creating a magical whirlpool underwater that collects pollution, surrounded by grateful merpeople with colorful tails",
    ],
};

static KINGDOM: Template = Template {
    theme: Theme::Kingdom,
    title: "{name} and the Dragon's Gift",
    moral: "True courage means facing your fears to help others.",
    story: [
        "In a kingdom far away, everyone was afraid of the dragon that lived in the mountain cave, except for {name}, who was curious rather than frightened.",
        "One day, {name} decided to visit the dragon, climbing the winding mountain path with only a lantern and a basket of freshly baked cookies.",
        "Inside the cave, {name} discovered not a fearsome beast, but a sad dragon named Ember who was crying glittering tears that turned into gemstones when they hit the ground.",
        "'Everyone is afraid of me,' Ember explained to {name}, 'but I'm actually lonely and just want to make friends with the people in the kingdom.'",
        "{name} had an idea and invited Ember to visit the kingdom during the annual festival, promising that they would help everyone see how gentle the dragon truly was.",
        "When the festival day arrived, {name} led Ember to the kingdom square where people initially ran away in fear, hiding behind market stalls and castle walls.",
        "{name} bravely stood beside Ember and explained to everyone that the dragon only wanted friendship and could help the kingdom with its magical fire that could forge the strongest tools and most beautiful art.",
        "Slowly, the people approached and welcomed Ember, and from that day forward, the kingdom flourished as {name} and Ember taught everyone that appearances can be deceiving and friendship can be found in the most unexpected places.",
    ],
    image_prompts: [
        "A child named {name} climbing a mountain path with a lantern and basket of cookies, approaching a cave with a faint glow coming from inside",
        "{name} sitting beside a gentle dragon named Ember inside a cave, with the dragon crying glittering tears that turn into gemstones",
        "{name} leading a colorful dragon named Ember into a medieval kingdom during a festival, with people hiding behind market stalls",
        "{name} and dragon Ember surrounded by smiling villagers in a medieval kingdom square, with the dragon using magical fire to create beautiful art",
    ],
};

static DINOSAUR: Template = Template {
    theme: Theme::Dinosaur,
    title: "{name}'s Prehistoric Adventure",
    moral: "Teamwork and understanding can overcome the biggest challenges.",
    story: [
        "{name} was digging in their backyard when their shovel hit something hard that turned out to be an unusual egg-shaped stone with swirling patterns.",
        "That night, the stone began to glow and pulse with light, and suddenly {name} found themselves transported to a prehistoric world filled with towering trees and giant ferns.",
        "A baby Triceratops nudged {name}'s hand, looking up with friendly eyes that seemed to ask for help finding its family.",
        "{name} and the baby dinosaur set off through the lush jungle, crossing bubbling lava streams and avoiding quicksand pits.",
        "Along the way, they met other dinosaurs: a helpful Pteranodon that showed them the way from above, and a gentle Brachiosaurus that helped them cross a wide river.",
        "Suddenly, the ground began to shake as a Tyrannosaurus Rex appeared, but instead of being scary, the T-Rex had a thorn stuck in its foot and was roaring in pain.",
        "{name} bravely approached the mighty dinosaur and carefully removed the thorn, earning a grateful nod from the T-Rex who then led them to the Triceratops herd.",
        "After a joyful reunion with the baby's family, the stone began to glow again, and {name} was transported home with a tiny dinosaur footprint fossil as a reminder of their amazing adventure.",
    ],
    image_prompts: [
        "A child named {name} in their backyard finding a glowing egg-shaped stone with swirling patterns while digging",
        "{name} in a prehistoric jungle with a baby Triceratops nudging their hand, surrounded by giant ferns and towering trees",
        "{name} and a baby Triceratops approaching a T-Rex with a thorn in its foot in a prehistoric landscape with volcanoes in the background",
        "{name} surrounded by a herd of Triceratops in a prehistoric setting, holding a glowing stone as it begins to transport them home",
    ],
};

/// Template for a theme key. Unknown keys and `custom` use the forest story.
fn template_for(theme: &str) -> &'static Template {
    match Theme::parse(theme) {
        Theme::Space => &SPACE,
        Theme::Ocean => &OCEAN,
        Theme::Kingdom => &KINGDOM,
        Theme::Dinosaur => &DINOSAUR,
        Theme::Forest | Theme::Custom => &FOREST,
    }
}

/// Render `lines` for `kid_name`, truncated or padded with `filler` to exactly `len`.
fn shaped(lines: &[&str], len: usize, filler: &str, kid_name: &str) -> Vec<String> {
    let mut out: Vec<String> = lines
        .iter()
        .take(len)
        .map(|line| line.replace(NAME, kid_name))
        .collect();
    let padding = filler.replace(NAME, kid_name);
    out.resize(len, padding);
    out
}

/// Build a fallback story for `request`.
///
/// `child_description` is accepted so callers can hand over whatever photo
/// analysis produced; the canned templates do not use it. Never fails.
pub fn create_fallback_story(request: &StoryRequest, child_description: &str) -> StoryDocument {
    let template = template_for(&request.theme);
    let sentences = request.sentence_count();
    let prompts = image_count(sentences);
    let kid_name = request.kid_name.as_str();

    info!(
        kid_name,
        requested_theme = %request.theme,
        template = template.theme.as_str(),
        sentences,
        description_len = child_description.len(),
        "creating fallback story"
    );

    let prompt_filler = FILLER_PROMPT.replace("{theme}", template.theme.as_str());

    StoryDocument {
        title: template.title.replace(NAME, kid_name),
        moral: template.moral.to_string(),
        story: shaped(&template.story, sentences, FILLER_SENTENCE, kid_name),
        image_prompts: shaped(&template.image_prompts, prompts, &prompt_filler, kid_name),
        images: vec![None; prompts],
    }
}
