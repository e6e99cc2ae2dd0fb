use std::collections::{HashMap, HashSet};

use dioxus::prelude::*;
use serde_json::Value;

use crate::domain::entities::column::InputType;
use crate::domain::entities::error::FieldError;
use crate::domain::entities::row::{value_to_text, Row};
use crate::usecase::services::form_schema::{
    date_from_edit, generate_slug, ChipInput, FormField, FormSchema,
};

const INPUT_STYLE: &str =
    "width: 100%; box-sizing: border-box; padding: 6px 8px; border: 1px solid #d1d5db; border-radius: 6px;";

fn text_of(values: &Row, key: &str) -> String {
    match values.get(key) {
        Some(Value::Object(_)) | Some(Value::Array(_)) => values
            .get(key)
            .and_then(|value| serde_json::to_string_pretty(value).ok())
            .unwrap_or_default(),
        Some(value) => value_to_text(value),
        None => String::new(),
    }
}

/// Values as they leave the form: editor dates become stored timestamps.
fn submitted_values(schema: &FormSchema, values: &Row, chips: &HashMap<String, ChipInput>) -> Row {
    let mut out = values.clone();
    for field in &schema.fields {
        match field.input_type {
            InputType::Date => {
                let text = text_of(values, &field.key);
                out.insert(field.key.clone(), date_from_edit(&text));
            }
            InputType::Chips => {
                if let Some(chip) = chips.get(&field.key) {
                    out.insert(field.key.clone(), chip.to_value());
                }
            }
            _ => {}
        }
    }
    out
}

#[component]
pub fn FormDialog(
    title: String,
    schema: FormSchema,
    initial: Row,
    errors: Vec<FieldError>,
    submit_error: Option<String>,
    submitting: bool,
    on_submit: EventHandler<Row>,
    on_cancel: EventHandler<()>,
) -> Element {
    let mut values = use_signal(|| initial.clone());
    let mut chips = use_signal(|| {
        schema
            .fields
            .iter()
            .filter(|field| field.input_type == InputType::Chips)
            .map(|field| {
                let current = initial.get(&field.key).cloned().unwrap_or(Value::Null);
                (field.key.clone(), ChipInput::from_value(&current))
            })
            .collect::<HashMap<String, ChipInput>>()
    });
    let mut edited_slugs = use_signal(HashSet::<String>::new);

    let slug_targets: Vec<(String, String)> = schema
        .fields
        .iter()
        .filter(|field| field.input_type == InputType::Slug)
        .filter_map(|field| Some((field.slug_source.clone()?, field.key.clone())))
        .collect();

    let set_value = move |key: String, value: Value| {
        let source_text = value_to_text(&value);
        let mut current = values.write();
        for (source, slug_key) in &slug_targets {
            if *source == key && !edited_slugs.read().contains(slug_key) {
                current.insert(slug_key.clone(), Value::String(generate_slug(&source_text)));
            }
        }
        current.insert(key, value);
    };

    let submit_schema = schema.clone();
    let snapshot = values();

    rsx! {
        div {
            style: "position: fixed; inset: 0; background: rgba(0,0,0,0.35); display: flex; align-items: center; justify-content: center; z-index: 1000;",
            div {
                style: "background: #fff; border-radius: 10px; padding: 20px; width: 560px; max-height: 85vh; overflow-y: auto; box-shadow: 0 20px 40px rgba(0,0,0,0.2);",
                h3 { style: "margin-top: 0;", "{title}" }
                {schema.fields.iter().map(|field| {
                    let message = errors
                        .iter()
                        .find(|error| error.field == field.key)
                        .map(|error| error.message.clone());
                    let widget = field_widget(field, &snapshot, chips, edited_slugs, set_value.clone());
                    let required_mark = if field.required { " *" } else { "" };
                    rsx! {
                        div { key: "{field.key}", style: "margin-bottom: 12px;",
                            label { style: "display: block; font-size: 13px; margin-bottom: 4px; color: #374151;",
                                "{field.label}{required_mark}"
                            }
                            {widget}
                            if let Some(message) = message {
                                div { style: "color: #b91c1c; font-size: 12px; margin-top: 2px;", "{message}" }
                            }
                        }
                    }
                })}
                if let Some(error) = submit_error {
                    div { style: "color: #b91c1c; margin: 8px 0;", "{error}" }
                }
                div { style: "display: flex; justify-content: flex-end; gap: 8px; margin-top: 16px;",
                    button {
                        onclick: move |_| on_cancel.call(()),
                        "Cancel"
                    }
                    button {
                        disabled: submitting,
                        style: "background: #111827; color: #fff; border: none; padding: 6px 14px; border-radius: 6px;",
                        onclick: move |_| {
                            let payload = submitted_values(&submit_schema, &values(), &chips());
                            on_submit.call(payload);
                        },
                        if submitting { "Saving..." } else { "Save" }
                    }
                }
            }
        }
    }
}

fn field_widget(
    field: &FormField,
    values: &Row,
    mut chips: Signal<HashMap<String, ChipInput>>,
    mut edited_slugs: Signal<HashSet<String>>,
    mut set_value: impl FnMut(String, Value) + Clone + 'static,
) -> Element {
    let key = field.key.clone();
    let current = text_of(values, &key);
    let disabled = field.read_only;
    let placeholder = field.placeholder.clone();

    match field.input_type {
        InputType::Checkbox => {
            let checked = matches!(values.get(&key), Some(Value::Bool(true)));
            rsx! {
                input {
                    r#type: "checkbox",
                    checked: checked,
                    disabled: disabled,
                    onchange: move |event| set_value(key.clone(), Value::Bool(event.checked())),
                }
            }
        }
        InputType::Select => {
            let options = field.options.clone();
            rsx! {
                select {
                    style: INPUT_STYLE,
                    disabled: disabled,
                    value: "{current}",
                    onchange: move |event| {
                        let picked = event.value();
                        let value = options
                            .iter()
                            .find(|option| value_to_text(&option.value) == picked)
                            .map(|option| option.value.clone())
                            .unwrap_or(Value::String(picked));
                        set_value(key.clone(), value);
                    },
                    {field.options.iter().map(|option| {
                        let value = value_to_text(&option.value);
                        let selected = value == current;
                        rsx! { option { value: "{value}", selected: selected, "{option.label}" } }
                    })}
                }
            }
        }
        InputType::Textarea | InputType::RichText => {
            let parse_json = field.input_type == InputType::Textarea;
            rsx! {
                textarea {
                    style: "{INPUT_STYLE} min-height: 96px; font-family: inherit;",
                    disabled: disabled,
                    placeholder: "{placeholder}",
                    value: "{current}",
                    oninput: move |event| {
                        let text = event.value();
                        let value = if parse_json {
                            serde_json::from_str::<Value>(&text)
                                .ok()
                                .filter(|parsed| parsed.is_object() || parsed.is_array())
                                .unwrap_or(Value::String(text))
                        } else {
                            Value::String(text)
                        };
                        set_value(key.clone(), value);
                    },
                }
            }
        }
        InputType::Chips => {
            let state = chips.read().get(&key).cloned().unwrap_or_default();
            let buffer = state.buffer.clone();
            let input_key = key.clone();
            let backspace_key = key.clone();
            rsx! {
                div { style: "{INPUT_STYLE} display: flex; flex-wrap: wrap; gap: 4px;",
                    {state.chips.iter().map(|chip| {
                        let chip = chip.clone();
                        let remove_key = key.clone();
                        let label = chip.clone();
                        rsx! {
                            span { style: "background: #e0e7ff; padding: 2px 6px; border-radius: 999px; font-size: 12px;",
                                "{label} "
                                button {
                                    style: "border: none; background: transparent; cursor: pointer;",
                                    onclick: move |_| {
                                        if let Some(entry) = chips.write().get_mut(&remove_key) {
                                            entry.remove(&chip);
                                        }
                                    },
                                    "×"
                                }
                            }
                        }
                    })}
                    input {
                        style: "border: none; outline: none; flex: 1; min-width: 80px;",
                        disabled: disabled,
                        placeholder: "{placeholder}",
                        value: "{buffer}",
                        oninput: move |event| {
                            chips.write().entry(input_key.clone()).or_default().input(&event.value());
                        },
                        onkeydown: move |event| {
                            let mut all = chips.write();
                            let entry = all.entry(backspace_key.clone()).or_default();
                            match event.key() {
                                Key::Enter => entry.commit(),
                                Key::Backspace => entry.backspace(),
                                _ => {}
                            }
                        },
                    }
                }
            }
        }
        InputType::Slug => rsx! {
            input {
                style: INPUT_STYLE,
                disabled: disabled,
                placeholder: "{placeholder}",
                value: "{current}",
                oninput: move |event| {
                    edited_slugs.write().insert(key.clone());
                    set_value(key.clone(), Value::String(generate_slug(&event.value())));
                },
            }
        },
        other => {
            let input_type = match other {
                InputType::Email => "email",
                InputType::Password => "password",
                InputType::Number => "number",
                InputType::Date => "date",
                InputType::ImageUrl | InputType::ImageUpload => "url",
                _ => "text",
            };
            rsx! {
                input {
                    r#type: input_type,
                    style: INPUT_STYLE,
                    disabled: disabled,
                    placeholder: "{placeholder}",
                    value: "{current}",
                    oninput: move |event| set_value(key.clone(), Value::String(event.value())),
                }
            }
        }
    }
}
