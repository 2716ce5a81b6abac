//! Built-in stage templates.
//!
//! Design and review templates are rendered against a `LayerInventory`
//! (`groups`) plus a pre-built `format` skeleton of the expected reply.

pub const CAPTION: &str = "caption";
pub const DESIGN: &str = "design";
pub const REVIEW: &str = "review";

pub const BUILTIN_TEMPLATES: [(&str, &str); 3] = [
    (CAPTION, CAPTION_TEMPLATE),
    (DESIGN, DESIGN_TEMPLATE),
    (REVIEW, REVIEW_TEMPLATE),
];

const CAPTION_TEMPLATE: &str = r#"You are an art critic with a trained eye for color and composition. I will upload an image. Describe its visual style so that a cartographer could reproduce the mood on a map: the dominant and accent colors (with approximate hex values), contrast, saturation, texture, line quality and the overall atmosphere.
Reply with plain prose only."#;

const DESIGN_TEMPLATE: &str = r#"You are a map stylesheet designer. I will upload a reference image and then a written description of it. Your task is to restyle a map so that it carries the look of the reference.

The map contains these elements:
{{#each groups}}
• {{category}} elements: {{#each layers}}{{name}}{{#unless @last}}, {{/unless}}{{/each}}.
{{/each}}

Requirements:
{{#each groups}}
{{#if is_icon}}
• For each {{category}} element, you can describe the expected style in as much detail as possible, e.g. its content, color, theme and design. An icon designer will work from your description.
{{else}}
• For each {{category}} element, you can set the {{#each properties}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}.
{{/if}}
{{/each}}

Explain your reasoning, then return one JSON file inside a ```json fenced block with this structure:
{{format}}"#;

const REVIEW_TEMPLATE: &str = r#"You are a map style reviewer. I will upload a reference image and then a map that was styled after it. Judge whether the map conveys the style of the reference.

The map contains these elements:
{{#each groups}}
• {{category}} elements: {{#each layers}}{{name}}{{#unless @last}}, {{/unless}}{{/each}}.
{{/each}}

Requirements:
{{#each groups}}
• For each {{category}} element, you can change the {{#each properties}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}.
{{/each}}

If the map already matches the reference well, answer with "Action": "Accept". Otherwise answer with "Action": "Revision" and list only the elements you want to change. Return one JSON file inside a ```json fenced block with this structure:
{{format}}"#;
