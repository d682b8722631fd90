use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitInt, LitStr, Member, Type, parse_macro_input};

/// Derive the `Vertex` trait for a packed Pod struct, declaring one vertex
/// attribute per field.
///
/// Every field is tagged with `#[vertex(...)]`:
///
/// - a semantic: `position`, `normal`, `tangent`, `color`, `texcoord0` ..
///   `texcoord7`, `blend_weight`, `blend_indices`
/// - optionally `format = "..."`: `float32`, `float16`, `unorm8`, `snorm8`,
///   `unorm16`, `snorm16`, `uint8`, `sint8`, `uint16`, `sint16`, `uint32`,
///   `sint32`
/// - optionally `dimension = N` with `N` in `1..=4`
///
/// Without an explicit format, the format and component count are inferred
/// from the field type: scalars, fixed arrays of scalars, and `Vec2`/`Vec3`/
/// `Vec4`/`Point3` style float vectors. Untagged fields and fields whose format
/// cannot be inferred are reported when the layout is first generated.
///
/// ```ignore
/// #[repr(C)]
/// #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Vertex)]
/// struct UiVertex {
///     #[vertex(position)]
///     position: [f32; 3],
///     #[vertex(color, format = "unorm8")]
///     color: [u8; 4],
///     #[vertex(texcoord0)]
///     uv: [f32; 2],
/// }
/// ```
#[proc_macro_derive(Vertex, attributes(vertex))]
pub fn derive_vertex(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Vertex cannot be derived for generic structs",
        ));
    }

    let fields: Vec<(Member, &Field)> = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields
                .named
                .iter()
                .filter_map(|f| f.ident.clone().map(|id| (Member::Named(id), f)))
                .collect(),
            Fields::Unnamed(fields) => fields
                .unnamed
                .iter()
                .enumerate()
                .map(|(i, f)| (Member::Unnamed(syn::Index::from(i)), f))
                .collect(),
            Fields::Unit => Vec::new(),
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Vertex can only be derived for structs",
            ));
        }
    };

    let descriptions = fields
        .iter()
        .map(|(member, field)| describe_field(name, member, field))
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl ::beaumesh_core::mesh::Vertex for #name {
            fn vertex_fields() -> &'static [::beaumesh_core::mesh::VertexField] {
                static FIELDS: ::std::sync::LazyLock<::std::vec::Vec<::beaumesh_core::mesh::VertexField>> =
                    ::std::sync::LazyLock::new(|| ::std::vec![#(#descriptions),*]);
                &FIELDS
            }
        }
    })
}

/// Parsed contents of the `#[vertex(...)]` attributes on one field.
#[derive(Default)]
struct VertexAttr {
    semantic: Option<Ident>,
    format: Option<Ident>,
    dimension: Option<u8>,
}

fn describe_field(
    owner: &Ident,
    member: &Member,
    field: &Field,
) -> syn::Result<proc_macro2::TokenStream> {
    let attr = parse_vertex_attr(field)?;
    let field_name = match member {
        Member::Named(id) => id.to_string(),
        Member::Unnamed(index) => index.index.to_string(),
    };
    let ty = &field.ty;

    let mut tokens = quote! {
        ::beaumesh_core::mesh::VertexField::new(
            #field_name,
            ::core::any::type_name::<#ty>(),
            ::core::mem::offset_of!(#owner, #member),
            ::core::mem::size_of::<#ty>(),
        )
    };
    if let Some(semantic) = attr.semantic {
        tokens = quote! { #tokens.with_semantic(::beaumesh_core::mesh::VertexAttributeSemantic::#semantic) };
    }
    if let Some(format) = attr.format {
        tokens = quote! { #tokens.with_format(::beaumesh_core::mesh::VertexAttributeFormat::#format) };
    }
    if let Some(dimension) = attr.dimension {
        tokens = quote! { #tokens.with_dimension(#dimension) };
    }
    if let Some((format, dimension)) = infer_format(ty) {
        let format = Ident::new(format, Span::call_site());
        tokens = quote! {
            #tokens.with_inferred(::beaumesh_core::mesh::VertexAttributeFormat::#format, #dimension)
        };
    }
    Ok(tokens)
}

fn parse_vertex_attr(field: &Field) -> syn::Result<VertexAttr> {
    let mut parsed = VertexAttr::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("vertex")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("format") {
                let lit: LitStr = meta.value()?.parse()?;
                let variant = format_variant(&lit.value())
                    .ok_or_else(|| syn::Error::new_spanned(&lit, "unknown vertex format"))?;
                parsed.format = Some(Ident::new(variant, lit.span()));
                return Ok(());
            }
            if meta.path.is_ident("dimension") {
                let lit: LitInt = meta.value()?.parse()?;
                let dimension: u8 = lit.base10_parse()?;
                if !(1..=4).contains(&dimension) {
                    return Err(syn::Error::new_spanned(&lit, "dimension must be 1..=4"));
                }
                parsed.dimension = Some(dimension);
                return Ok(());
            }

            let ident = meta
                .path
                .get_ident()
                .ok_or_else(|| meta.error("expected a vertex attribute semantic"))?;
            let variant = semantic_variant(&ident.to_string())
                .ok_or_else(|| meta.error("unknown vertex attribute semantic"))?;
            if parsed.semantic.is_some() {
                return Err(meta.error("a field can carry only one vertex attribute semantic"));
            }
            parsed.semantic = Some(Ident::new(variant, ident.span()));
            Ok(())
        })?;
    }
    Ok(parsed)
}

fn semantic_variant(name: &str) -> Option<&'static str> {
    Some(match name {
        "position" => "Position",
        "normal" => "Normal",
        "tangent" => "Tangent",
        "color" => "Color",
        "texcoord0" => "TexCoord0",
        "texcoord1" => "TexCoord1",
        "texcoord2" => "TexCoord2",
        "texcoord3" => "TexCoord3",
        "texcoord4" => "TexCoord4",
        "texcoord5" => "TexCoord5",
        "texcoord6" => "TexCoord6",
        "texcoord7" => "TexCoord7",
        "blend_weight" => "BlendWeight",
        "blend_indices" => "BlendIndices",
        _ => return None,
    })
}

fn format_variant(name: &str) -> Option<&'static str> {
    Some(match name {
        "float32" => "Float32",
        "float16" => "Float16",
        "unorm8" => "UNorm8",
        "snorm8" => "SNorm8",
        "unorm16" => "UNorm16",
        "snorm16" => "SNorm16",
        "uint8" => "UInt8",
        "sint8" => "SInt8",
        "uint16" => "UInt16",
        "sint16" => "SInt16",
        "uint32" => "UInt32",
        "sint32" => "SInt32",
        _ => return None,
    })
}

/// Infer `(format, dimension)` from a field type by matching the last path
/// segment, or the element type and length of a fixed array.
fn infer_format(ty: &Type) -> Option<(&'static str, u8)> {
    match ty {
        Type::Array(array) => {
            let (format, 1) = infer_format(&array.elem)? else {
                return None;
            };
            let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Int(len),
                ..
            }) = &array.len
            else {
                return None;
            };
            let len: u8 = len.base10_parse().ok()?;
            (1..=4).contains(&len).then_some((format, len))
        }
        Type::Path(_) => match extract_last_segment(ty).as_str() {
            "f32" => Some(("Float32", 1)),
            "u32" => Some(("UInt32", 1)),
            "i32" => Some(("SInt32", 1)),
            "u16" => Some(("UInt16", 1)),
            "i16" => Some(("SInt16", 1)),
            "u8" => Some(("UInt8", 1)),
            "i8" => Some(("SInt8", 1)),
            "Vec2" | "Vector2" => Some(("Float32", 2)),
            "Vec3" | "Vector3" | "Point3" => Some(("Float32", 3)),
            "Vec4" | "Vector4" => Some(("Float32", 4)),
            _ => None,
        },
        _ => None,
    }
}

/// Extract the last segment name from a type path (e.g. `nalgebra::Vector3` → `"Vector3"`).
fn extract_last_segment(ty: &Type) -> String {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}
