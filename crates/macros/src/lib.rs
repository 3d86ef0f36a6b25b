use proc_macro::TokenStream;
use quote::quote;
use syn::{FnArg, ItemFn, Type, spanned::Spanned};

#[derive(deluxe::ParseMetaItem)]
#[deluxe(attributes(scoring_feature))]
struct FeatureAttributes(syn::Ident, #[deluxe(flatten)] FeatureNamedAttributes);

#[derive(deluxe::ParseMetaItem)]
struct FeatureNamedAttributes {
  name: String,
  reason: String,
  fallback: syn::Expr,
}

/// Declares a unit struct implementing `Feature<L, R>` from a single scoring
/// function.
///
/// The pair types are read from the last two arguments of the function,
/// and any generic parameters it declares are hoisted onto the generated
/// `impl` block.
#[proc_macro_attribute]
pub fn scoring_feature(attrs: TokenStream, input: TokenStream) -> TokenStream {
  match expand(attrs.into(), proc_macro2::TokenStream::from(input)) {
    Ok(output) => output.into(),
    Err(err) => err.to_compile_error().into(),
  }
}

fn expand(attrs: proc_macro2::TokenStream, input: proc_macro2::TokenStream) -> syn::Result<proc_macro2::TokenStream> {
  let FeatureAttributes(ident, FeatureNamedAttributes { name, reason, fallback }) = deluxe::parse2::<FeatureAttributes>(attrs)?;
  let mut function = syn::parse2::<ItemFn>(input)?;

  let operands = function
    .sig
    .inputs
    .iter()
    .filter_map(|arg| match arg {
      FnArg::Typed(arg) => Some(arg),
      FnArg::Receiver(_) => None,
    })
    .map(|arg| match arg.ty.as_ref() {
      Type::Reference(reference) => Ok(reference.elem.as_ref().clone()),
      other => Err(syn::Error::new(other.span(), "feature operands must be taken by reference")),
    })
    .collect::<Result<Vec<_>, _>>()?;

  let (lhs, rhs) = match operands.as_slice() {
    [.., lhs, rhs] => (lhs.clone(), rhs.clone()),
    _ => return Err(syn::Error::new(function.sig.span(), "a feature takes at least two operands")),
  };

  let generics = std::mem::take(&mut function.sig.generics);
  let (impl_generics, _, where_clause) = generics.split_for_impl();

  Ok(quote! {
      pub struct #ident;

      impl #impl_generics Feature<#lhs, #rhs> for #ident #where_clause {
        fn name(&self) -> &'static str {
            #name
        }

        fn reason(&self) -> &'static str {
            #reason
        }

        fn fallback(&self) -> f64 {
            #fallback
        }

        #[tracing::instrument(level = "trace", name = #name, skip_all)]
        #function
      }
  })
}

#[cfg(test)]
mod tests {
  use quote::quote;

  fn attrs() -> proc_macro2::TokenStream {
    quote! { Skills, name = "skills", reason = "has the skills", fallback = 0.5 }
  }

  #[test]
  fn operands_become_the_pair() {
    let output = super::expand(
      attrs(),
      quote! {
        fn score_feature(&self, _thresholds: &Thresholds, lhs: &Task, rhs: &Volunteer) -> Option<f64> {
          None
        }
      },
    )
    .unwrap()
    .to_string();

    assert!(output.contains("pub struct Skills"));
    assert!(output.contains("impl Feature < Task , Volunteer > for Skills"));
    assert!(output.contains("\"has the skills\""));
  }

  #[test]
  fn generics_are_hoisted() {
    let output = super::expand(
      attrs(),
      quote! {
        fn score_feature<L: Located, R: Located>(&self, _thresholds: &Thresholds, lhs: &L, rhs: &R) -> Option<f64> {
          None
        }
      },
    )
    .unwrap()
    .to_string();

    assert!(output.contains("impl < L : Located , R : Located > Feature < L , R > for Skills"));
    assert!(output.contains("fn score_feature (& self"));
  }

  #[test]
  fn operands_must_be_references() {
    let err = super::expand(
      attrs(),
      quote! {
        fn score_feature(&self, lhs: Task, rhs: Volunteer) -> Option<f64> {
          None
        }
      },
    )
    .unwrap_err();

    assert_eq!(err.to_string(), "feature operands must be taken by reference");
  }

  #[test]
  fn two_operands_are_required() {
    let err = super::expand(attrs(), quote! { fn score_feature(&self, lhs: &Task) -> Option<f64> { None } }).unwrap_err();

    assert_eq!(err.to_string(), "a feature takes at least two operands");
  }
}
