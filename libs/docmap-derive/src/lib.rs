use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, Expr, ExprLit, Fields, Lit, LitStr, Type};

/// Derive `docmap::Record` (and `docmap::Attribute`, so the type can be
/// nested in other records) for a struct with named fields.
///
/// The struct must implement `Default`: decoding starts from the default
/// value and only assigns the keys present in the document.
///
/// # Example
///
/// ```ignore
/// #[derive(Record, Default)]
/// #[docmap(rename_all = "PascalCase")]
/// pub struct Order {
///     pub id: String,
///
///     #[docmap(rename = "Qty")]
///     pub quantity: u32,
///
///     #[docmap(converter = "crate::convert::StatusByName")]
///     pub status: Status,
///
///     #[docmap(ignore)]
///     pub scratch: Vec<u8>,
/// }
/// ```
///
/// Container attributes: `rename_all = "PascalCase" | "camelCase" |
/// "snake_case" | "SCREAMING_SNAKE_CASE" | "kebab-case"`.
/// Field attributes: `rename = "..."`, `ignore`, `converter = "path"`.
///
/// Raw identifiers lose their `r#` prefix: `r#type` is stored as `type`.
///
/// # Rejected input
///
/// Tuple structs:
///
/// ```compile_fail
/// #[derive(docmap::Record, Default)]
/// struct Pair(i32, i32);
/// ```
///
/// Generic structs:
///
/// ```compile_fail
/// #[derive(docmap::Record, Default)]
/// struct Wrapper<T> {
///     inner: T,
/// }
/// ```
///
/// Enums:
///
/// ```compile_fail
/// #[derive(docmap::Record, Default)]
/// enum Mode {
///     #[default]
///     On,
/// }
/// ```
///
/// Unknown attribute keys:
///
/// ```compile_fail
/// #[derive(docmap::Record, Default)]
/// struct Item {
///     #[docmap(flatten)]
///     name: String,
/// }
/// ```
///
/// ```compile_fail
/// #[derive(docmap::Record, Default)]
/// #[docmap(rename_all = "Title Case")]
/// struct Item {
///     name: String,
/// }
/// ```
///
/// A field both ignored and converted:
///
/// ```compile_fail
/// #[derive(Default)]
/// struct Upper;
///
/// impl docmap::AttributeConverter for Upper {
///     type Value = String;
///
///     fn to_entry(&self, value: &String) -> Result<docmap::Entry, docmap::ConversionError> {
///         Ok(value.to_uppercase().into())
///     }
///
///     fn from_entry(&self, entry: &docmap::Entry) -> Result<String, docmap::ConversionError> {
///         Ok(format!("{entry:?}"))
///     }
/// }
///
/// #[derive(docmap::Record, Default)]
/// struct Item {
///     #[docmap(ignore, converter = "Upper")]
///     name: String,
/// }
/// ```
///
/// The same shapes written correctly compile:
///
/// ```
/// #[derive(Default)]
/// struct Upper;
///
/// impl docmap::AttributeConverter for Upper {
///     type Value = String;
///
///     fn to_entry(&self, value: &String) -> Result<docmap::Entry, docmap::ConversionError> {
///         Ok(value.to_uppercase().into())
///     }
///
///     fn from_entry(&self, entry: &docmap::Entry) -> Result<String, docmap::ConversionError> {
///         Ok(format!("{entry:?}"))
///     }
/// }
///
/// #[derive(docmap::Record, Default)]
/// #[docmap(rename_all = "camelCase")]
/// struct Item {
///     #[docmap(converter = "Upper")]
///     name: String,
///     #[docmap(ignore)]
///     scratch: Vec<u8>,
///     r#type: u8,
/// }
/// ```
#[proc_macro_derive(Record, attributes(docmap))]
pub fn derive_record(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive `docmap::ScalarValue` and `docmap::Attribute` for a fieldless enum.
///
/// Values are stored as the integer discriminant, never as the variant name.
/// Use a converter on the field to store names instead.
///
/// Discriminants are read as `i64`. A literal discriminant outside that range
/// is rejected; one computed by a constant expression is cast with `as i64`
/// and wraps.
///
/// ```compile_fail
/// #[derive(docmap::Enumeration, Default)]
/// #[repr(u64)]
/// enum Huge {
///     #[default]
///     Small = 1,
///     Big = 9_223_372_036_854_775_808,
/// }
/// ```
///
/// Data-carrying variants:
///
/// ```compile_fail
/// #[derive(docmap::Enumeration)]
/// enum Shape {
///     Circle(f64),
///     Square { side: f64 },
/// }
/// ```
///
/// ```
/// #[derive(docmap::Enumeration, Default)]
/// #[repr(u64)]
/// enum Level {
///     #[default]
///     Low = 1,
///     High = 9_223_372_036_854_775_807,
/// }
/// ```
#[proc_macro_derive(Enumeration)]
pub fn derive_enumeration(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match enumeration_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn record_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let name_str = name.unraw().to_string();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Record only supports structs")),
    };

    // Parse #[docmap(rename_all = "...")] on the struct.
    let mut rename_all: Option<RenameRule> = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("docmap") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let value: LitStr = meta.value()?.parse()?;
                rename_all = Some(RenameRule::parse(&value)?);
                Ok(())
            } else {
                Err(meta.error("unknown container attribute (expected `rename_all`)"))
            }
        })?;
    }

    let mut descriptor_tokens = Vec::new();

    for field in fields {
        let field_name = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "expected named field")
        })?;
        let member_str = field_name.unraw().to_string();
        let field_ty = &field.ty;

        // Parse #[docmap(...)] on the field.
        let mut rename: Option<String> = None;
        let mut ignore = false;
        let mut converter: Option<Type> = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("docmap") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    rename = Some(value.value());
                } else if meta.path.is_ident("ignore") {
                    ignore = true;
                } else if meta.path.is_ident("converter") {
                    let value: LitStr = meta.value()?.parse()?;
                    converter = Some(value.parse()?);
                } else {
                    return Err(meta.error(
                        "unknown field attribute (expected `rename`, `ignore` or `converter`)",
                    ));
                }
                Ok(())
            })?;
        }

        if ignore && converter.is_some() {
            return Err(syn::Error::new_spanned(
                field_name,
                "a field cannot be both ignored and converted",
            ));
        }

        let attr_name = match (&rename, &rename_all) {
            (Some(explicit), _) => explicit.clone(),
            (None, Some(rule)) => rule.apply(&member_str),
            (None, None) => member_str.clone(),
        };

        let constructor = if ignore {
            quote! {
                ::docmap::FieldDescriptor::<Self>::ignored::<#field_ty>(#attr_name)
            }
        } else if let Some(converter_ty) = &converter {
            quote! {
                ::docmap::FieldDescriptor::<Self>::with_converter::<#field_ty, #converter_ty>(
                    #attr_name,
                    |r: &Self| &r.#field_name,
                    |r: &mut Self| &mut r.#field_name,
                )
            }
        } else {
            quote! {
                ::docmap::FieldDescriptor::<Self>::new::<#field_ty>(
                    #attr_name,
                    |r: &Self| &r.#field_name,
                    |r: &mut Self| &mut r.#field_name,
                )
            }
        };

        descriptor_tokens.push(quote! {
            #constructor.member(#member_str)
        });
    }

    let expanded = quote! {
        impl ::docmap::Record for #name {
            fn fields() -> ::std::vec::Vec<::docmap::FieldDescriptor<Self>> {
                ::std::vec![
                    #(#descriptor_tokens),*
                ]
            }

            fn type_name() -> &'static str {
                #name_str
            }
        }

        impl ::docmap::Attribute for #name {
            fn shape() -> ::docmap::Shape {
                ::docmap::Shape::Record(::docmap::RecordRef::of::<Self>())
            }

            fn plan(
                __cache: &::docmap::CodecCache,
            ) -> ::std::result::Result<::docmap::ValuePlan<Self>, ::docmap::UnsupportedTypeError> {
                ::docmap::synth::record::<Self>(__cache)
            }
        }
    };

    Ok(expanded)
}

fn enumeration_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let name_str = name.unraw().to_string();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Enumeration does not support generic enums",
        ));
    }

    let data = match &input.data {
        Data::Enum(data) => data,
        _ => return Err(syn::Error::new_spanned(name, "Enumeration only supports enums")),
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(name, "Enumeration needs at least one variant"));
    }

    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Enumeration only supports fieldless variants",
            ));
        }
        if let Some((_, Expr::Lit(ExprLit { lit: Lit::Int(value), .. }))) = &variant.discriminant {
            if value.base10_parse::<i64>().is_err() {
                return Err(syn::Error::new_spanned(
                    value,
                    "Enumeration discriminants must fit in i64",
                ));
            }
        }
        variants.push(&variant.ident);
    }

    let expanded = quote! {
        impl ::docmap::ScalarValue for #name {
            const KIND: ::docmap::ScalarKind = ::docmap::ScalarKind::Enum;

            fn to_scalar(&self) -> ::docmap::Scalar {
                match self {
                    #(Self::#variants => ::docmap::Scalar::Int(Self::#variants as i64),)*
                }
            }

            fn from_scalar(
                __scalar: &::docmap::Scalar,
                __config: &::docmap::CodecConfig,
            ) -> ::std::result::Result<Self, ::docmap::ConversionError> {
                let __value = ::docmap::scalar::enum_discriminant::<Self>(__scalar, __config)?;
                #(
                    if __value == Self::#variants as i64 {
                        return ::std::result::Result::Ok(Self::#variants);
                    }
                )*
                ::std::result::Result::Err(::docmap::scalar::unknown_discriminant::<Self>(__value))
            }
        }

        impl ::docmap::Attribute for #name {
            fn shape() -> ::docmap::Shape {
                ::docmap::Shape::Enum(#name_str)
            }

            fn plan(
                __cache: &::docmap::CodecCache,
            ) -> ::std::result::Result<::docmap::ValuePlan<Self>, ::docmap::UnsupportedTypeError> {
                ::std::result::Result::Ok(::docmap::synth::enumeration::<Self>(__cache.config()))
            }
        }
    };

    Ok(expanded)
}

/// Case conventions for `rename_all`.
#[derive(Clone, Copy)]
enum RenameRule {
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> Result<Self, syn::Error> {
        match lit.value().as_str() {
            "PascalCase" => Ok(Self::Pascal),
            "camelCase" => Ok(Self::Camel),
            "snake_case" => Ok(Self::Snake),
            "SCREAMING_SNAKE_CASE" => Ok(Self::ScreamingSnake),
            "kebab-case" => Ok(Self::Kebab),
            other => Err(syn::Error::new_spanned(
                lit,
                format!(
                    "unknown rename_all '{other}' (expected PascalCase, camelCase, snake_case, \
                     SCREAMING_SNAKE_CASE or kebab-case)"
                ),
            )),
        }
    }

    /// Rust field names are snake_case; split on `_` and reassemble.
    fn apply(self, field: &str) -> String {
        let words = field.split('_').filter(|w| !w.is_empty());
        match self {
            Self::Pascal => words.map(capitalize).collect(),
            Self::Camel => {
                let mut out = String::new();
                for (i, word) in words.enumerate() {
                    if i == 0 {
                        out.push_str(word);
                    } else {
                        out.push_str(&capitalize(word));
                    }
                }
                out
            }
            Self::Snake => words.collect::<Vec<_>>().join("_"),
            Self::ScreamingSnake => words.map(str::to_uppercase).collect::<Vec<_>>().join("_"),
            Self::Kebab => words.collect::<Vec<_>>().join("-"),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
